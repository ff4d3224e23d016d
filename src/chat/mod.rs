// Chat domain types: rooms, messages and slash-command parsing

pub use command::{is_slash_command, CommandName, CommandPattern, SlashCommand};
pub use models::{Message, MessageId, RoomId};

mod command;
mod models;
