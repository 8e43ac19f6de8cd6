//! Telegram channel adapter
//!
//! Long-polls getUpdates for incoming messages and uses the Bot API for
//! sending, deleting, and roster lookups.

mod api;
pub mod polling;
pub mod rate_limiter;
pub mod roster;
pub mod types;

use std::time::Duration;

use reqwest::Client;

pub use rate_limiter::SendPacer;
pub use roster::ChannelRoster;
pub use types::TgUser;

/// Minimum interval between outbound calls per chat (1000ms)
const DEFAULT_SEND_INTERVAL_MS: u64 = 1000;

/// Request timeout; must exceed the getUpdates long-poll window
const HTTP_TIMEOUT_SECS: u64 = 40;

/// An incoming message as delivered by the polling loop
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub thread_id: Option<i64>,
    pub message_id: i64,
    /// Personal sender, absent for chat-as-sender posts
    pub from: Option<TgUser>,
    /// Id of the chat posting as itself, when applicable
    pub sender_chat_id: Option<i64>,
    pub text: Option<String>,
    /// Unix timestamp of the message
    pub date: i64,
}

/// Telegram channel adapter
#[derive(Clone)]
pub struct TelegramChannel {
    token: String,
    client: Client,
    /// Pacer for outbound send/delete operations
    pacer: SendPacer,
}

impl TelegramChannel {
    /// Create a new Telegram channel adapter
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            pacer: SendPacer::new(Duration::from_millis(DEFAULT_SEND_INTERVAL_MS)),
        }
    }
}
