//! Rate-limit decision engine
//!
//! Turns an incoming message event into a verdict by layering three
//! independently mutable exemption sources (platform admins, the
//! custom-admin overlay, cooldown overrides) over the message ledger.
//! The policy lock is held across the check-then-record sequence so two
//! near-simultaneous messages from one user cannot both read "no
//! record" and both be allowed.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ChatId, MessageLedger, OverlayRegistry, ThreadId, UserId};
use crate::Result;
use crate::telegram::types::{ANONYMOUS_ADMIN_ID, SERVICE_NOTIFICATIONS_ID};

/// Platform admin roster lookup, fallible
///
/// A lookup failure degrades to "not an admin" in the engine, so a
/// transient platform outage fails closed, never open.
#[async_trait]
pub trait AdminRoster: Send + Sync {
    /// Whether `user` is a platform-native admin of `chat`
    ///
    /// # Errors
    ///
    /// Returns an error when the roster cannot be fetched.
    async fn is_platform_admin(&self, chat: ChatId, user: UserId) -> Result<bool>;
}

/// A (chat, forum topic) pair the warden enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedTopic {
    pub chat_id: ChatId,
    pub thread_id: ThreadId,
}

/// Resolved sender identity of an incoming message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    /// An ordinary personal account
    User(UserId),
    /// A chat posting as itself (anonymous admin or linked channel)
    Chat(ChatId),
}

/// Incoming message descriptor, as delivered by the transport
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub chat_id: ChatId,
    pub thread_id: Option<ThreadId>,
    pub message_id: i64,
    pub sender: Sender,
    /// Unix timestamp of the message
    pub timestamp: i64,
}

/// Outcome of a rate-limit decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Message is outside every watched (chat, topic) pair
    Ignored,
    /// Platform admin or anonymous-admin sentinel sender
    ExemptAdmin,
    /// On the operator-managed custom-admin list
    ExemptCustom,
    /// Holds a zero-second cooldown override (green card)
    ExemptUnlimited,
    /// First message, or cooldown elapsed; ledger updated
    Allowed,
    /// Cooldown not elapsed; caller deletes the message
    Rejected {
        /// Seconds until the user may post again
        retry_after_secs: u64,
        /// The effective cooldown that gated the message
        cooldown_secs: u64,
    },
}

/// Mutable policy state behind the engine's lock
pub struct PolicyState {
    pub ledger: MessageLedger,
    pub overlays: OverlayRegistry,
}

/// The decision engine: shared policy state plus exemption sources
pub struct RateDecisionEngine {
    state: Arc<Mutex<PolicyState>>,
    roster: Arc<dyn AdminRoster>,
    watched: Vec<WatchedTopic>,
    default_cooldown: u64,
}

impl RateDecisionEngine {
    #[must_use]
    pub fn new(
        state: Arc<Mutex<PolicyState>>,
        roster: Arc<dyn AdminRoster>,
        watched: Vec<WatchedTopic>,
        default_cooldown: u64,
    ) -> Self {
        Self {
            state,
            roster,
            watched,
            default_cooldown,
        }
    }

    /// Handle to the shared policy state (admin command handlers take
    /// the same lock)
    #[must_use]
    pub fn state(&self) -> Arc<Mutex<PolicyState>> {
        Arc::clone(&self.state)
    }

    /// The default cooldown in seconds
    #[must_use]
    pub const fn default_cooldown(&self) -> u64 {
        self.default_cooldown
    }

    /// Whether (chat, thread) is one of the watched topics
    #[must_use]
    pub fn watches(&self, chat: ChatId, thread: Option<ThreadId>) -> bool {
        thread.is_some_and(|t| {
            self.watched
                .iter()
                .any(|w| w.chat_id == chat && w.thread_id == t)
        })
    }

    /// Whether `chat` is one of the watched chats (admin commands may
    /// arrive in any topic of a watched chat)
    #[must_use]
    pub fn watches_chat(&self, chat: ChatId) -> bool {
        self.watched.iter().any(|w| w.chat_id == chat)
    }

    /// Decide the verdict for one incoming message
    ///
    /// Exempt verdicts never touch the ledger. `Allowed` records the
    /// message before releasing the lock; a persistence failure there
    /// is logged as a durability warning but never reverses the verdict,
    /// since the message was already let through.
    pub async fn decide(&self, event: &MessageEvent) -> Verdict {
        if !self.watches(event.chat_id, event.thread_id) {
            return Verdict::Ignored;
        }

        let user = match event.sender {
            // Anonymous admins post as the chat itself; linked-channel
            // posts carry the service account. Neither maps to a real
            // user, both are exempt.
            Sender::Chat(_) => return Verdict::ExemptAdmin,
            Sender::User(ANONYMOUS_ADMIN_ID | SERVICE_NOTIFICATIONS_ID) => {
                return Verdict::ExemptAdmin;
            }
            Sender::User(id) => id,
        };

        match self.roster.is_platform_admin(event.chat_id, user).await {
            Ok(true) => return Verdict::ExemptAdmin,
            Ok(false) => {}
            Err(e) => {
                // Fail closed: a roster outage enforces the limit on
                // everyone, including real admins, until it resolves.
                tracing::warn!(
                    chat_id = event.chat_id,
                    user_id = user,
                    error = %e,
                    "admin roster lookup failed, treating sender as non-admin"
                );
            }
        }

        let mut state = self.state.lock().await;

        if state.overlays.is_custom_admin(event.chat_id, user) {
            return Verdict::ExemptCustom;
        }

        let cooldown = state
            .overlays
            .cooldown_for(event.chat_id, user, self.default_cooldown);
        if cooldown == 0 {
            return Verdict::ExemptUnlimited;
        }

        let cooldown_i = i64::try_from(cooldown).unwrap_or(i64::MAX);
        if let Some(last) = state.ledger.last_seen(event.chat_id, user) {
            let elapsed = event.timestamp.saturating_sub(last);
            if elapsed < cooldown_i {
                return Verdict::Rejected {
                    retry_after_secs: (cooldown_i - elapsed).unsigned_abs(),
                    cooldown_secs: cooldown,
                };
            }
        }

        if let Err(e) = state
            .ledger
            .record_message(event.chat_id, user, event.timestamp)
        {
            tracing::warn!(
                chat_id = event.chat_id,
                user_id = user,
                error = %e,
                "ledger write failed, allowed message may not survive a restart"
            );
        }
        Verdict::Allowed
    }
}
