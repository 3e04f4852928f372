use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use teloxide::dispatching::ShutdownToken;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::config::TelegramConfig;
use crate::platform::{Command, IncomingMessage, MessageKind};
use crate::responder::Responder;

/// Username the bot answers to in `/cmd@name` form
#[derive(Debug, Clone)]
struct BotUsername(Option<String>);

/// Run the Telegram bot platform until SIGINT or SIGTERM
pub async fn run(responder: Arc<Responder>, config: &TelegramConfig) -> Result<()> {
    let bot = Bot::new(&config.bot_token);

    info!("Starting Telegram platform...");

    let username = bot_username(bot.get_me().await.map(|me| me.user.username.clone()));

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let allowed_user_ids = config.allowed_user_ids.clone();
    let handler = Update::filter_message()
        .filter_map(move |msg: Message| {
            let from = msg.from.as_ref().map(|user| user.id.0);
            is_allowed(&allowed_user_ids, from).then_some(msg)
        })
        .endpoint(handle_message);

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![responder, username])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build();

    tokio::spawn(shutdown_on_terminate(dispatcher.shutdown_token()));

    dispatcher.dispatch().await;

    info!("Telegram platform stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_on_terminate(token: ShutdownToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            return;
        }
    };
    terminate.recv().await;

    info!("SIGTERM received, shutting down");
    shutdown_when_running(|| token.shutdown()).await;
}

#[cfg(not(unix))]
async fn shutdown_on_terminate(_token: ShutdownToken) {}

/// An empty allow-list serves everyone; otherwise the sender must be listed.
fn is_allowed(allowed_user_ids: &[u64], from: Option<u64>) -> bool {
    if allowed_user_ids.is_empty() {
        return true;
    }
    from.is_some_and(|id| allowed_user_ids.contains(&id))
}

/// Without a username, `/cmd@name` commands are accepted for any name.
fn bot_username<E: Display>(me: std::result::Result<Option<String>, E>) -> BotUsername {
    match me {
        Ok(username) => {
            info!("Authorized as @{}", username.as_deref().unwrap_or("<unnamed>"));
            BotUsername(username)
        }
        Err(e) => {
            warn!("Failed to look up bot username: {}", e);
            BotUsername(None)
        }
    }
}

const SHUTDOWN_RETRY: Duration = Duration::from_millis(100);

/// Keep asking until the dispatcher accepts the request, so a signal that
/// arrives before `dispatch()` starts is not lost.
async fn shutdown_when_running<F, Fut, E>(mut try_shutdown: F)
where
    F: FnMut() -> std::result::Result<Fut, E>,
    Fut: Future<Output = ()>,
{
    loop {
        match try_shutdown() {
            Ok(done) => return done.await,
            Err(_) => tokio::time::sleep(SHUTDOWN_RETRY).await,
        }
    }
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    responder: Arc<Responder>,
    username: BotUsername,
) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    let incoming = IncomingMessage {
        chat_id: msg.chat.id.0,
        user_id: msg.from.as_ref().map(|user| user.id.0),
        text,
    };

    info!(
        "Telegram message in chat {} from {:?}: {}",
        incoming.chat_id, incoming.user_id, incoming.text
    );

    let kind = MessageKind::parse(&incoming.text, username.0.as_deref());

    if matches!(kind, MessageKind::Text(_)) {
        bot.send_chat_action(msg.chat.id, teloxide::types::ChatAction::Typing)
            .await
            .ok();
    }

    if let Some(reply) = responder.respond(kind).await {
        bot.send_message(ChatId(incoming.chat_id), reply).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_allow_list_serves_everyone() {
        assert!(is_allowed(&[], Some(42)));
        assert!(is_allowed(&[], None));
    }

    #[test]
    fn test_listed_user_is_allowed() {
        assert!(is_allowed(&[7, 42], Some(42)));
    }

    #[test]
    fn test_unlisted_user_is_dropped() {
        assert!(!is_allowed(&[7, 42], Some(8)));
    }

    #[test]
    fn test_missing_sender_is_dropped_when_list_set() {
        assert!(!is_allowed(&[7], None));
    }

    #[test]
    fn test_username_lookup_failure_is_not_fatal() {
        let username = bot_username::<&str>(Err("connection timed out"));
        assert_eq!(username.0, None);
    }

    #[test]
    fn test_username_lookup_success() {
        let username = bot_username::<&str>(Ok(Some("shortlink_bot".to_string())));
        assert_eq!(username.0.as_deref(), Some("shortlink_bot"));
    }

    #[tokio::test]
    async fn test_shutdown_retries_until_dispatcher_runs() {
        let mut attempts = 0;
        shutdown_when_running(|| {
            attempts += 1;
            if attempts < 3 {
                Err("idle")
            } else {
                Ok(async {})
            }
        })
        .await;
        assert_eq!(attempts, 3);
    }
}
