pub mod telegram;

use teloxide::utils::command::BotCommands;

/// A text message received from the chat platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Chat the reply goes back to
    pub chat_id: i64,
    /// Sender, absent for channel posts
    pub user_id: Option<u64>,
    /// The message text
    pub text: String,
}

#[derive(BotCommands, Debug, Clone, Copy, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Commands:")]
pub enum Command {
    #[command(description = "show the greeting")]
    Start,
    #[command(description = "explain how to use the bot")]
    Help,
}

impl Command {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            _ => None,
        }
    }
}

/// Every shape of inbound text the bot distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Command(Command),
    /// Unknown commands and commands addressed to another bot
    Ignored,
    Text(String),
}

impl MessageKind {
    /// Classify `text`. `bot_username` is used to drop `/cmd@otherbot` in groups.
    ///
    /// Only `/` followed by a word character starts a command, the same rule
    /// Telegram uses for `bot_command` entities; anything else is plain text.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Self {
        let rest = match text.strip_prefix('/') {
            Some(rest) if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') => {
                rest
            }
            _ => return MessageKind::Text(text.to_string()),
        };

        let head = rest.split_whitespace().next().unwrap_or_default();
        let (name, addressee) = match head.split_once('@') {
            Some((name, addressee)) => (name, Some(addressee)),
            None => (head, None),
        };

        if let (Some(addressee), Some(me)) = (addressee, bot_username) {
            if !addressee.eq_ignore_ascii_case(me) {
                return MessageKind::Ignored;
            }
        }

        match Command::from_name(name) {
            Some(command) => MessageKind::Command(command),
            None => MessageKind::Ignored,
        }
    }
}
