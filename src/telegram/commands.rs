//! Command parsing and dispatch for the bot's /start and /stop commands.

use super::Update;
use crate::feed::FeedSource;
use crate::poll::{DeliverySink, PollLoop};
use crate::predictor::Predictor;
use crate::registry::{RegisterOutcome, SubscriberId, SubscriptionRegistry, UnregisterOutcome};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { key: Option<String> },
    Stop,
}

/// Parse a message text as a bot command. Handles the `/cmd@BotName` form
/// Telegram uses in group chats; anything else is ignored.
pub fn parse_command(text: &str) -> Option<Command> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?;
    let head = head.split('@').next().unwrap_or(head);
    match head {
        "/start" => Some(Command::Start {
            key: parts.next().map(str::to_owned),
        }),
        "/stop" => Some(Command::Stop),
        _ => None,
    }
}

/// Command dispatcher: owns the registry and the collaborators a freshly
/// spawned poll loop needs.
pub struct Bot {
    registry: Arc<SubscriptionRegistry>,
    feed: Arc<dyn FeedSource>,
    predictor: Arc<dyn Predictor>,
    sink: Arc<dyn DeliverySink>,
    access_key: String,
    poll_interval: Duration,
}

impl Bot {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        feed: Arc<dyn FeedSource>,
        predictor: Arc<dyn Predictor>,
        sink: Arc<dyn DeliverySink>,
        access_key: String,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            feed,
            predictor,
            sink,
            access_key,
            poll_interval,
        }
    }

    /// Handle one incoming update. Returns the chat to reply to and the
    /// reply text, or `None` when the update carries no command.
    pub fn handle_update(&self, update: &Update) -> Option<(SubscriberId, String)> {
        let message = update.message.as_ref()?;
        let command = parse_command(message.text.as_deref()?)?;
        Some((message.chat.id, self.handle_command(message.chat.id, command)))
    }

    /// Execute a command for a chat. Every outcome, including rejections and
    /// duplicate registrations, is an informational reply rather than an
    /// error.
    pub fn handle_command(&self, chat_id: SubscriberId, command: Command) -> String {
        match command {
            Command::Start { key } => {
                if key.as_deref() != Some(self.access_key.as_str()) {
                    return "❌ Invalid access key.".to_string();
                }
                match self.registry.register(chat_id) {
                    RegisterOutcome::AlreadyActive => "🔄 Already running prediction.".to_string(),
                    RegisterOutcome::Registered => {
                        // Registration succeeded, so this is the only loop
                        // for this chat; it stops itself once /stop flips
                        // the registry entry.
                        PollLoop::new(
                            chat_id,
                            Arc::clone(&self.registry),
                            Arc::clone(&self.feed),
                            Arc::clone(&self.predictor),
                            Arc::clone(&self.sink),
                            self.poll_interval,
                        )
                        .spawn();
                        "✅ Prediction started! You will now receive predictions...".to_string()
                    }
                }
            }
            Command::Stop => match self.registry.unregister(chat_id) {
                UnregisterOutcome::Unregistered => "🛑 Prediction stopped.".to_string(),
                UnregisterOutcome::NotActive => "😴 No prediction is running.".to_string(),
            },
        }
    }
}
