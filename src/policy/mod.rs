//! Rate-limit policy core
//!
//! The decision engine and its persistent state model: the message
//! ledger (last allowed message per user), the overlays that exempt
//! users from the limit (custom admins, per-user cooldown overrides),
//! and the retention sweep.

pub mod engine;
pub mod ledger;
pub mod overlays;
pub mod sweeper;

/// Telegram numeric chat identifier
pub type ChatId = i64;
/// Telegram numeric user identifier
pub type UserId = i64;
/// Forum-topic (message thread) identifier within a chat
pub type ThreadId = i64;

pub use engine::{
    AdminRoster, MessageEvent, PolicyState, RateDecisionEngine, Sender, Verdict, WatchedTopic,
};
pub use ledger::MessageLedger;
pub use overlays::OverlayRegistry;
