//! Message ledger: last allowed message timestamp per (chat, user)
//!
//! One record per pair, overwritten on every allowed message, never a
//! history. Rejected messages never touch the ledger; only an explicit
//! administrative reset or the retention sweep removes records.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{ChatId, UserId};
use crate::Result;
use crate::store::{StateStore, load_document, save_document};

/// Document name for the message ledger
pub const LEDGER_DOC: &str = "message_records";

/// Write-through persisted ledger of last-allowed-message timestamps
pub struct MessageLedger {
    store: Arc<dyn StateStore>,
    records: HashMap<ChatId, BTreeMap<UserId, i64>>,
}

impl MessageLedger {
    /// Load the ledger document from the store (missing/corrupt → empty)
    #[must_use]
    pub fn load(store: Arc<dyn StateStore>) -> Self {
        let records = load_document(store.as_ref(), LEDGER_DOC);
        Self { store, records }
    }

    /// Unix timestamp of the last allowed message from `user` in `chat`
    #[must_use]
    pub fn last_seen(&self, chat: ChatId, user: UserId) -> Option<i64> {
        self.records.get(&chat).and_then(|map| map.get(&user)).copied()
    }

    /// Record an allowed message, overwriting the previous timestamp
    ///
    /// Timestamps never move backward; a stale `ts` keeps the existing
    /// record (only an explicit reset rewinds a user).
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the document fails; the in-memory
    /// record stands and the caller logs a durability warning.
    pub fn record_message(&mut self, chat: ChatId, user: UserId, ts: i64) -> Result<()> {
        let slot = self.records.entry(chat).or_default().entry(user).or_insert(ts);
        *slot = (*slot).max(ts);
        save_document(self.store.as_ref(), LEDGER_DOC, &self.records)
    }

    /// Remove a user's record so their next message is always allowed
    ///
    /// Resetting an unknown user is a no-op; returns whether a record
    /// existed.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the document fails.
    pub fn reset_user(&mut self, chat: ChatId, user: UserId) -> Result<bool> {
        let Some(map) = self.records.get_mut(&chat) else {
            return Ok(false);
        };
        if map.remove(&user).is_none() {
            return Ok(false);
        }
        if map.is_empty() {
            self.records.remove(&chat);
        }
        save_document(self.store.as_ref(), LEDGER_DOC, &self.records)?;
        Ok(true)
    }

    /// Records within the trailing `window_secs`, newest first
    ///
    /// Audit aid for the duplicate report: the ledger structurally holds
    /// one record per user, so this lists users seen recently rather
    /// than detecting bypassed limits retroactively.
    #[must_use]
    pub fn recent_activity(&self, chat: ChatId, window_secs: u64, now: i64) -> Vec<(UserId, i64)> {
        let cutoff = now.saturating_sub(i64::try_from(window_secs).unwrap_or(i64::MAX));
        let mut entries: Vec<(UserId, i64)> = self
            .records
            .get(&chat)
            .map(|map| {
                map.iter()
                    .filter(|(_, ts)| **ts >= cutoff)
                    .map(|(user, ts)| (*user, *ts))
                    .collect()
            })
            .unwrap_or_default();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }

    /// All records for `chat`, for status reporting
    #[must_use]
    pub fn snapshot(&self, chat: ChatId) -> BTreeMap<UserId, i64> {
        self.records.get(&chat).cloned().unwrap_or_default()
    }

    /// Chats that currently hold at least one record
    #[must_use]
    pub fn snapshot_chats(&self) -> Vec<ChatId> {
        self.records.keys().copied().collect()
    }

    /// Evict records older than their chat's retention horizon
    ///
    /// `horizon_for` maps a chat to the largest cooldown reachable in
    /// it, so no evicted entry could still gate a message. Returns the
    /// number of evicted records; persists only when something changed.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the document fails.
    pub fn sweep(&mut self, now: i64, mut horizon_for: impl FnMut(ChatId) -> u64) -> Result<usize> {
        let mut evicted = 0;
        self.records.retain(|chat, map| {
            let horizon = i64::try_from(horizon_for(*chat)).unwrap_or(i64::MAX);
            map.retain(|_, ts| {
                let stale = now.saturating_sub(*ts) > horizon;
                if stale {
                    evicted += 1;
                }
                !stale
            });
            !map.is_empty()
        });
        if evicted > 0 {
            save_document(self.store.as_ref(), LEDGER_DOC, &self.records)?;
        }
        Ok(evicted)
    }
}
