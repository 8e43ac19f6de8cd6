//! Exemption overlays: custom admins and per-user cooldown overrides
//!
//! Both overlays are chat-scoped and mutated only by explicit admin
//! commands. Every mutation is written through to its own persisted
//! document immediately; a custom admin in one chat has no standing in
//! another.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::{ChatId, UserId};
use crate::Result;
use crate::store::{StateStore, load_document, save_document};

/// Document name for the custom-admin sets
pub const ADMINS_DOC: &str = "custom_admins";
/// Document name for the cooldown overrides
pub const COOLDOWNS_DOC: &str = "cooldown_overrides";

/// Operator-managed exemption overlays, write-through persisted
pub struct OverlayRegistry {
    store: Arc<dyn StateStore>,
    admins: HashMap<ChatId, BTreeSet<UserId>>,
    cooldowns: HashMap<ChatId, BTreeMap<UserId, u64>>,
}

impl OverlayRegistry {
    /// Load both overlay documents from the store
    ///
    /// Missing or corrupt documents start empty; see [`load_document`].
    #[must_use]
    pub fn load(store: Arc<dyn StateStore>) -> Self {
        let admins = load_document(store.as_ref(), ADMINS_DOC);
        let cooldowns = load_document(store.as_ref(), COOLDOWNS_DOC);
        Self {
            store,
            admins,
            cooldowns,
        }
    }

    /// Whether `user` is on the custom-admin list of `chat`
    #[must_use]
    pub fn is_custom_admin(&self, chat: ChatId, user: UserId) -> bool {
        self.admins.get(&chat).is_some_and(|set| set.contains(&user))
    }

    /// Add `user` to the custom-admin list of `chat`
    ///
    /// Returns `false` if the user was already listed (no write issued).
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the document fails; the in-memory
    /// change stands.
    pub fn add_custom_admin(&mut self, chat: ChatId, user: UserId) -> Result<bool> {
        if !self.admins.entry(chat).or_default().insert(user) {
            return Ok(false);
        }
        save_document(self.store.as_ref(), ADMINS_DOC, &self.admins)?;
        Ok(true)
    }

    /// Remove `user` from the custom-admin list of `chat` (idempotent)
    ///
    /// Returns `false` if the user was not listed.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the document fails.
    pub fn remove_custom_admin(&mut self, chat: ChatId, user: UserId) -> Result<bool> {
        let Some(set) = self.admins.get_mut(&chat) else {
            return Ok(false);
        };
        if !set.remove(&user) {
            return Ok(false);
        }
        if set.is_empty() {
            self.admins.remove(&chat);
        }
        save_document(self.store.as_ref(), ADMINS_DOC, &self.admins)?;
        Ok(true)
    }

    /// The custom-admin list of `chat`
    #[must_use]
    pub fn list_custom_admins(&self, chat: ChatId) -> BTreeSet<UserId> {
        self.admins.get(&chat).cloned().unwrap_or_default()
    }

    /// Effective cooldown for `user` in `chat`
    ///
    /// Zero means unlimited. Absence of an override means `default`.
    #[must_use]
    pub fn cooldown_for(&self, chat: ChatId, user: UserId, default: u64) -> u64 {
        self.cooldowns
            .get(&chat)
            .and_then(|map| map.get(&user))
            .copied()
            .unwrap_or(default)
    }

    /// Set a per-user cooldown override (0 = unlimited)
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the document fails.
    pub fn set_cooldown(&mut self, chat: ChatId, user: UserId, secs: u64) -> Result<()> {
        self.cooldowns.entry(chat).or_default().insert(user, secs);
        save_document(self.store.as_ref(), COOLDOWNS_DOC, &self.cooldowns)
    }

    /// Remove a per-user cooldown override, reverting to the default
    ///
    /// A missing override is a no-op; returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the document fails.
    pub fn reset_cooldown(&mut self, chat: ChatId, user: UserId) -> Result<bool> {
        let Some(map) = self.cooldowns.get_mut(&chat) else {
            return Ok(false);
        };
        if map.remove(&user).is_none() {
            return Ok(false);
        }
        if map.is_empty() {
            self.cooldowns.remove(&chat);
        }
        save_document(self.store.as_ref(), COOLDOWNS_DOC, &self.cooldowns)?;
        Ok(true)
    }

    /// All cooldown overrides for `chat`
    #[must_use]
    pub fn list_cooldowns(&self, chat: ChatId) -> BTreeMap<UserId, u64> {
        self.cooldowns.get(&chat).cloned().unwrap_or_default()
    }

    /// Largest cooldown reachable in `chat`, including the default
    ///
    /// This is the chat's retention horizon: no ledger entry younger
    /// than this can still gate a message.
    #[must_use]
    pub fn max_cooldown(&self, chat: ChatId, default: u64) -> u64 {
        self.cooldowns
            .get(&chat)
            .and_then(|map| map.values().max())
            .copied()
            .map_or(default, |m| m.max(default))
    }
}
