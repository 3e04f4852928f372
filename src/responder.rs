use std::sync::Arc;

use teloxide::utils::command::BotCommands;
use tracing::debug;

use crate::platform::{Command, MessageKind};
use crate::shortener::Shortener;
use crate::validator::is_valid_url;

pub const GREETING: &str = "Hi! Send me a URL and I will shorten it for you.";
pub const INVALID_URL: &str = "Invalid URL. Please provide a valid URL.";
pub const SHORTEN_FAILED: &str = "Failed to shorten the URL. Please try again.";

/// Turns one classified message into at most one reply.
/// Platform-agnostic; the shortener is injected at construction.
pub struct Responder {
    shortener: Arc<dyn Shortener>,
}

impl Responder {
    pub fn new(shortener: Arc<dyn Shortener>) -> Self {
        Self { shortener }
    }

    /// `None` only for ignored commands.
    pub async fn respond(&self, kind: MessageKind) -> Option<String> {
        match kind {
            MessageKind::Command(Command::Start) => Some(GREETING.to_string()),
            MessageKind::Command(Command::Help) => Some(help_text()),
            MessageKind::Ignored => None,
            MessageKind::Text(text) => Some(self.shorten_reply(&text).await),
        }
    }

    async fn shorten_reply(&self, text: &str) -> String {
        if !is_valid_url(text) {
            debug!("Rejected invalid URL: {}", text);
            return INVALID_URL.to_string();
        }

        // Failures are logged by the shortener itself
        match self.shortener.shorten(text).await {
            Ok(short_url) => format!("Shortened URL: {}", short_url),
            Err(_) => SHORTEN_FAILED.to_string(),
        }
    }
}

fn help_text() -> String {
    format!(
        "Send me a link starting with http://, https://, ftp:// or ftps:// \
         and I will reply with a shortened version.\n\n{}",
        Command::descriptions()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use crate::shortener::{ShortenError, ShortenResult};

    /// Records every call and answers with a fixed outcome.
    struct FakeShortener {
        calls: AtomicUsize,
        short_url: Option<&'static str>,
    }

    impl FakeShortener {
        fn returning(short_url: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                short_url: Some(short_url),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                short_url: None,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Shortener for FakeShortener {
        async fn shorten(&self, _long_url: &str) -> ShortenResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.short_url {
                Some(url) => Ok(url.to_string()),
                None => Err(ShortenError::Status {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: String::new(),
                }),
            }
        }
    }

    async fn reply_to(responder: &Responder, text: &str) -> Option<String> {
        responder.respond(MessageKind::parse(text, None)).await
    }

    #[tokio::test]
    async fn test_valid_url_is_shortened() {
        let shortener = FakeShortener::returning("https://bit.ly/abc123");
        let responder = Responder::new(shortener.clone());

        let reply = reply_to(&responder, "http://example.com").await;

        assert_eq!(reply.as_deref(), Some("Shortened URL: https://bit.ly/abc123"));
        assert_eq!(shortener.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_skips_shortener() {
        let shortener = FakeShortener::returning("https://bit.ly/abc123");
        let responder = Responder::new(shortener.clone());

        let reply = reply_to(&responder, "banana").await;

        assert_eq!(reply.as_deref(), Some(INVALID_URL));
        assert_eq!(shortener.calls(), 0);
    }

    #[tokio::test]
    async fn test_slash_prefixed_text_is_checked_as_url() {
        let shortener = FakeShortener::returning("https://bit.ly/abc123");
        let responder = Responder::new(shortener.clone());

        let reply = reply_to(&responder, "//example.com").await;

        assert_eq!(reply.as_deref(), Some(INVALID_URL));
        assert_eq!(shortener.calls(), 0);
    }

    #[tokio::test]
    async fn test_shortener_failure_gives_generic_reply() {
        let shortener = FakeShortener::failing();
        let responder = Responder::new(shortener.clone());

        let reply = reply_to(&responder, "https://localhost:8080/path?q=1").await;

        assert_eq!(reply.as_deref(), Some(SHORTEN_FAILED));
        assert_eq!(shortener.calls(), 1);
    }

    #[tokio::test]
    async fn test_start_sends_greeting() {
        let shortener = FakeShortener::returning("unused");
        let responder = Responder::new(shortener.clone());

        let reply = reply_to(&responder, "/start").await;

        assert_eq!(reply.as_deref(), Some(GREETING));
        assert_eq!(shortener.calls(), 0);
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let responder = Responder::new(FakeShortener::returning("unused"));

        let reply = reply_to(&responder, "/help").await.unwrap();

        assert!(reply.contains("https://"));
        assert!(reply.contains("/start"));
    }

    #[tokio::test]
    async fn test_unknown_command_gets_no_reply() {
        let shortener = FakeShortener::returning("unused");
        let responder = Responder::new(shortener.clone());

        assert_eq!(reply_to(&responder, "/settings").await, None);
        assert_eq!(shortener.calls(), 0);
    }
}
