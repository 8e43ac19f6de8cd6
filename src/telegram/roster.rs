//! Platform-admin roster backed by getChatAdministrators with a TTL cache
//!
//! Telegram has no per-user membership query cheap enough to issue on
//! every message, so the full administrator list is fetched and cached
//! per chat. Lookup failures propagate so the engine can fail closed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mini_moka::sync::Cache;

use super::TelegramChannel;
use crate::Result;
use crate::policy::{AdminRoster, ChatId, UserId};

/// Roster cache TTL (5 minutes)
const ROSTER_TTL_SECS: u64 = 300;

/// Admin roster lookup over the Telegram channel
pub struct ChannelRoster {
    channel: TelegramChannel,
    cache: Cache<ChatId, Arc<HashSet<UserId>>>,
}

impl ChannelRoster {
    /// Create a roster with the default 5-minute cache TTL
    #[must_use]
    pub fn new(channel: TelegramChannel) -> Self {
        Self::with_ttl(channel, Duration::from_secs(ROSTER_TTL_SECS))
    }

    /// Create a roster with an explicit cache TTL
    #[must_use]
    pub fn with_ttl(channel: TelegramChannel, ttl: Duration) -> Self {
        Self {
            channel,
            cache: Cache::builder().time_to_live(ttl).build(),
        }
    }
}

#[async_trait]
impl AdminRoster for ChannelRoster {
    async fn is_platform_admin(&self, chat: ChatId, user: UserId) -> Result<bool> {
        if let Some(admins) = self.cache.get(&chat) {
            return Ok(admins.contains(&user));
        }

        let members = self.channel.get_chat_administrators(chat).await.map_err(|e| {
            crate::Error::AdminLookup(format!("getChatAdministrators for {chat}: {e}"))
        })?;
        let admins: Arc<HashSet<UserId>> =
            Arc::new(members.into_iter().map(|m| m.user.id).collect());
        tracing::debug!(chat_id = chat, admins = admins.len(), "refreshed admin roster");
        self.cache.insert(chat, Arc::clone(&admins));
        Ok(admins.contains(&user))
    }
}
