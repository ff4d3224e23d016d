use regex::Regex;
use std::fmt;

use crate::shared::RouterError;

/// A message is a slash command iff its body, after leading whitespace, starts with `/`
pub fn is_slash_command(body: &str) -> bool {
    body.trim_start().starts_with('/')
}

/// A slash command split into its command name and the remaining arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    /// Command name without the leading slash (`help` for `/help`)
    pub name: String,
    /// Body after the command token, leading whitespace removed
    pub arguments: String,
}

impl SlashCommand {
    /// Parses a message body; returns `None` for regular messages
    pub fn parse(body: &str) -> Option<Self> {
        let trimmed = body.trim_start();
        let token_and_rest = trimmed.strip_prefix('/')?;

        let (name, arguments) = match token_and_rest.find(char::is_whitespace) {
            Some(end) => (&token_and_rest[..end], token_and_rest[end..].trim_start()),
            None => (token_and_rest, ""),
        };

        Some(Self {
            name: name.to_string(),
            arguments: arguments.to_string(),
        })
    }
}

/// A validated slash-command name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandName(String);

impl CommandName {
    /// Accepts `help` or `/help`; the stored name never includes the slash
    pub fn parse(name: &str) -> Result<Self, RouterError> {
        let bare = name.strip_prefix('/').unwrap_or(name);
        if bare.is_empty() {
            return Err(RouterError::invalid_pattern(name, "command name is empty"));
        }
        if bare.chars().any(char::is_whitespace) {
            return Err(RouterError::invalid_pattern(
                name,
                "command name contains whitespace",
            ));
        }
        if bare.starts_with('/') {
            return Err(RouterError::invalid_pattern(name, "command name has extra slashes"));
        }
        Ok(Self(bare.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// Which slash commands a subscription wants
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Every slash-prefixed message
    Any,
    /// Only messages whose first token is exactly `/name` (case-sensitive)
    Exact(CommandName),
    /// Command names fully matching a regular expression, e.g. `export-(json|csv)`
    Regex(Regex),
}

impl CommandPattern {
    pub fn any() -> Self {
        CommandPattern::Any
    }

    pub fn exact(name: &str) -> Result<Self, RouterError> {
        CommandName::parse(name).map(CommandPattern::Exact)
    }

    /// Compiles `pattern` anchored at both ends of the command name
    pub fn regex(pattern: &str) -> Result<Self, RouterError> {
        Regex::new(&format!("^(?:{pattern})$"))
            .map(CommandPattern::Regex)
            .map_err(|e| RouterError::invalid_pattern(pattern, e.to_string()))
    }

    pub fn matches(&self, command_name: &str) -> bool {
        match self {
            CommandPattern::Any => true,
            CommandPattern::Exact(name) => name.as_str() == command_name,
            CommandPattern::Regex(regex) => regex.is_match(command_name),
        }
    }
}

impl fmt::Display for CommandPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandPattern::Any => f.write_str("*"),
            CommandPattern::Exact(name) => write!(f, "{name}"),
            CommandPattern::Regex(regex) => write!(f, "regex:{}", regex.as_str()),
        }
    }
}
