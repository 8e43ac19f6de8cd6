//! Configuration for the warden
//!
//! Layering: built-in defaults ← TOML file ← env/CLI overrides.

pub mod file;

use std::path::PathBuf;

use crate::policy::WatchedTopic;
use crate::{Error, Result};

pub use file::{WardenConfigFile, load_config_file};

/// Default cooldown between messages: 24 hours
pub const DEFAULT_COOLDOWN_SECS: u64 = 86_400;

/// Default rejection-notice lifetime: 10 seconds
pub const DEFAULT_NOTICE_TTL_SECS: u64 = 10;

/// Default backoff after a failed poll: 5 seconds
pub const DEFAULT_POLL_ERROR_BACKOFF_SECS: u64 = 5;

/// Default retention-sweep interval: 1 hour
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3_600;

/// Resolved warden configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token (`WARDEN_BOT_TOKEN`)
    pub bot_token: String,

    /// Watched (chat, topic) pairs; messages elsewhere are ignored
    pub watched: Vec<WatchedTopic>,

    /// Default cooldown between messages, in seconds
    pub default_cooldown_secs: u64,

    /// How long rejection notices stay visible, in seconds
    pub notice_ttl_secs: u64,

    /// Backoff after a failed getUpdates poll, in seconds
    pub poll_error_backoff_secs: u64,

    /// Interval between ledger retention sweeps, in seconds
    pub sweep_interval_secs: u64,

    /// State-file directory
    pub data_dir: PathBuf,
}

/// CLI-level overrides applied on top of the config file
#[derive(Debug, Default)]
pub struct Overrides {
    pub bot_token: Option<String>,
    pub data_dir: Option<PathBuf>,
    /// An extra watched topic from `--chat-id`/`--thread-id`
    pub watch: Option<WatchedTopic>,
}

impl Config {
    /// Resolve the runtime configuration from a loaded file and overrides
    ///
    /// # Errors
    ///
    /// Returns an error when the bot token is missing, no watched topic
    /// is configured, or no data directory can be determined.
    pub fn resolve(file: WardenConfigFile, overrides: Overrides) -> Result<Self> {
        let bot_token = overrides
            .bot_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::Config("bot token missing (set WARDEN_BOT_TOKEN or --token)".to_string())
            })?;

        let mut watched: Vec<WatchedTopic> = file
            .watch
            .iter()
            .map(|w| WatchedTopic {
                chat_id: w.chat_id,
                thread_id: w.thread_id,
            })
            .collect();
        if let Some(extra) = overrides.watch {
            if !watched.contains(&extra) {
                watched.push(extra);
            }
        }
        if watched.is_empty() {
            return Err(Error::Config(
                "no watched topic configured (add [[watch]] entries or pass --chat-id/--thread-id)"
                    .to_string(),
            ));
        }

        let data_dir = overrides
            .data_dir
            .or(file.runtime.data_dir)
            .or_else(default_data_dir)
            .ok_or_else(|| Error::Config("cannot determine a data directory".to_string()))?;

        Ok(Self {
            bot_token,
            watched,
            default_cooldown_secs: file
                .limits
                .default_cooldown_secs
                .unwrap_or(DEFAULT_COOLDOWN_SECS),
            notice_ttl_secs: file.limits.notice_ttl_secs.unwrap_or(DEFAULT_NOTICE_TTL_SECS),
            poll_error_backoff_secs: file
                .runtime
                .poll_error_backoff_secs
                .unwrap_or(DEFAULT_POLL_ERROR_BACKOFF_SECS),
            sweep_interval_secs: file
                .runtime
                .sweep_interval_secs
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            data_dir,
        })
    }
}

/// Default state directory: `<platform data dir>/omni/warden`
#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.data_dir().join("omni").join("warden"))
}
