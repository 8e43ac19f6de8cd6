//! Per-chat pacing of outbound Telegram API calls

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Per-chat rate limiter for outbound send/delete operations
#[derive(Debug, Clone)]
pub struct SendPacer {
    /// Minimum interval between calls per chat
    interval: Duration,
    /// Last call timestamp per chat
    last_call: Arc<Mutex<HashMap<i64, Instant>>>,
}

impl SendPacer {
    /// Create a pacer with the given minimum interval between calls per chat
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if a call is allowed for the given chat. Returns true if allowed.
    pub fn check(&self, chat_id: i64) -> bool {
        let mut map = self.last_call.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if let Some(last) = map.get(&chat_id) {
            if now.duration_since(*last) < self.interval {
                return false;
            }
        }

        map.insert(chat_id, now);
        true
    }

    /// Record a 429 response — push the effective interval forward for this chat
    pub fn backoff(&self, chat_id: i64) {
        let mut map = self.last_call.lock().unwrap_or_else(|e| e.into_inner());
        let future = Instant::now() + self.interval;
        map.insert(chat_id, future);
    }

    /// The configured minimum interval
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}
