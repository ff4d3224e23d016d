#![allow(dead_code)] // Test utilities may not all be used in every test

use std::collections::HashMap;
use std::sync::Arc;

use chat_router::{InMemoryChat, Message, MessageRouter, RoomId, RouterConfig};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub router: MessageRouter,
    pub chats: HashMap<String, Arc<InMemoryChat>>,
}

impl TestSetup {
    pub fn room_id(name: &str) -> RoomId {
        RoomId::parse(name).expect("valid room id")
    }

    /// The in-memory document backing `name`
    pub fn chat(&self, name: &str) -> &Arc<InMemoryChat> {
        self.chats
            .get(name)
            .unwrap_or_else(|| panic!("no chat named {name}"))
    }

    /// Appends a stamped message to the room's document
    pub fn post(&self, room: &str, id: &str, body: &str) -> Message {
        let message = Message::new(id, body, "alice");
        self.chat(room).add_message(message.clone());
        message
    }

    /// Registers a further room backed by a fresh document
    pub fn open_room(&mut self, name: &str) -> Arc<InMemoryChat> {
        let chat = Arc::new(InMemoryChat::new());
        self.router
            .register_room(Self::room_id(name), chat.clone())
            .expect("room registers");
        self.chats.insert(name.to_string(), chat.clone());
        chat
    }
}

pub struct TestSetupBuilder {
    rooms: Vec<(String, Vec<Message>)>,
    config: RouterConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            rooms: vec![],
            config: RouterConfig::default(),
        }
    }

    pub fn with_room(self, name: &str) -> Self {
        self.with_seeded_room(name, vec![])
    }

    /// A room whose document already holds `messages` when it is registered
    pub fn with_seeded_room(mut self, name: &str, messages: Vec<Message>) -> Self {
        self.rooms.push((name.to_string(), messages));
        self
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Creates the router and registers every room; needs a tokio runtime
    pub fn build(self) -> TestSetup {
        let mut setup = TestSetup {
            router: MessageRouter::new(self.config),
            chats: HashMap::new(),
        };

        for (name, messages) in self.rooms {
            let chat = Arc::new(InMemoryChat::with_messages(messages));
            setup
                .router
                .register_room(TestSetup::room_id(&name), chat.clone())
                .expect("room registers");
            setup.chats.insert(name, chat);
        }
        setup
    }
}
