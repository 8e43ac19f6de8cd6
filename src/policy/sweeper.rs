//! Retention sweep of stale ledger entries
//!
//! Memory management only: a swept entry behaves exactly like "cooldown
//! elapsed", so sweeping can never change a verdict. The horizon per
//! chat is the largest cooldown reachable there, so no evicted entry
//! could still gate a message.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::engine::PolicyState;

/// Evict ledger entries older than their chat's retention horizon
///
/// Returns the number of evicted records. A persistence failure after
/// eviction is logged; the next sweep will retry the write.
pub async fn sweep_once(state: &Mutex<PolicyState>, default_cooldown: u64, now: i64) -> usize {
    let mut state = state.lock().await;
    let horizons: Vec<_> = state
        .ledger
        .snapshot_chats()
        .into_iter()
        .map(|chat| (chat, state.overlays.max_cooldown(chat, default_cooldown)))
        .collect();
    match state.ledger.sweep(now, |chat| {
        horizons
            .iter()
            .find(|(c, _)| *c == chat)
            .map_or(default_cooldown, |(_, h)| *h)
    }) {
        Ok(evicted) => {
            if evicted > 0 {
                tracing::debug!(evicted, "swept stale ledger entries");
            }
            evicted
        }
        Err(e) => {
            tracing::warn!(error = %e, "ledger sweep failed to persist");
            0
        }
    }
}

/// Spawn the periodic sweep task
pub fn spawn(
    state: Arc<Mutex<PolicyState>>,
    default_cooldown: u64,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick fires immediately: sweep on startup
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            sweep_once(&state, default_cooldown, now).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{MessageLedger, OverlayRegistry};
    use crate::store::MemoryStore;

    const CHAT: i64 = -1_001_234;

    fn state() -> Mutex<PolicyState> {
        let store = Arc::new(MemoryStore::new());
        Mutex::new(PolicyState {
            ledger: MessageLedger::load(store.clone()),
            overlays: OverlayRegistry::load(store),
        })
    }

    #[tokio::test]
    async fn sweep_respects_override_horizon() {
        let state = state();
        {
            let mut s = state.lock().await;
            // user 2 has a week-long override, so their entry must
            // survive a sweep that evicts day-old default entries
            s.overlays.set_cooldown(CHAT, 2, 604_800).unwrap();
            s.ledger.record_message(CHAT, 1, 0).unwrap();
            s.ledger.record_message(CHAT, 2, 0).unwrap();
        }
        let evicted = sweep_once(&state, 86_400, 90_000).await;
        assert_eq!(evicted, 0);

        let evicted = sweep_once(&state, 86_400, 700_000).await;
        assert_eq!(evicted, 2);
        let s = state.lock().await;
        assert!(s.ledger.snapshot(CHAT).is_empty());
    }

    #[tokio::test]
    async fn sweep_within_horizon_keeps_entries() {
        let state = state();
        {
            let mut s = state.lock().await;
            s.ledger.record_message(CHAT, 1, 50_000).unwrap();
        }
        assert_eq!(sweep_once(&state, 86_400, 90_000).await, 0);
        let s = state.lock().await;
        assert_eq!(s.ledger.last_seen(CHAT, 1), Some(50_000));
    }
}
