//! Topic Warden - Telegram forum-topic message limiter
//!
//! Enforces a per-user message-rate policy inside watched forum topics:
//! one message per cooldown window (default 24 hours), with platform
//! admins, a custom-admin list, and zero-cooldown "green cards" exempt.
//! Violating messages are deleted and answered with a self-expiring
//! notice. Policy state persists in flat JSON documents.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                Telegram Bot API                      │
//! │   getUpdates  │  sendMessage  │  deleteMessage      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Topic Warden                         │
//! │   Polling  │  Decision Engine  │  Admin Commands    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │            Persisted policy state                    │
//! │   ledger  │  custom admins  │  cooldown overrides   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod daemon;
pub mod error;
pub mod policy;
pub mod store;
pub mod telegram;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use policy::{
    AdminRoster, MessageEvent, MessageLedger, OverlayRegistry, PolicyState, RateDecisionEngine,
    Sender, Verdict, WatchedTopic,
};
pub use store::{JsonFileStore, MemoryStore, StateStore};
pub use telegram::{ChannelRoster, TelegramChannel};
