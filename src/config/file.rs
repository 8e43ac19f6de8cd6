//! TOML configuration file loading
//!
//! Supports `~/.config/omni/warden/config.toml` as a persistent config
//! source. All fields are optional — the file is a partial overlay on
//! top of defaults (the watched-topic list being the one thing that has
//! no sensible default).

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct WardenConfigFile {
    /// Watched (chat, topic) pairs
    #[serde(default)]
    pub watch: Vec<WatchFileEntry>,

    /// Rate-limit policy settings
    #[serde(default)]
    pub limits: LimitsFileConfig,

    /// Runtime settings
    #[serde(default)]
    pub runtime: RuntimeFileConfig,
}

/// One watched forum topic
#[derive(Debug, Deserialize)]
pub struct WatchFileEntry {
    /// Supergroup chat id (e.g. -1001234567890)
    pub chat_id: i64,
    /// Forum-topic (message thread) id within the chat
    pub thread_id: i64,
}

/// Rate-limit policy settings
#[derive(Debug, Default, Deserialize)]
pub struct LimitsFileConfig {
    /// Default cooldown between messages, in seconds
    pub default_cooldown_secs: Option<u64>,

    /// How long rejection notices stay visible, in seconds
    pub notice_ttl_secs: Option<u64>,
}

/// Runtime settings
#[derive(Debug, Default, Deserialize)]
pub struct RuntimeFileConfig {
    /// Backoff after a failed getUpdates poll, in seconds
    pub poll_error_backoff_secs: Option<u64>,

    /// Interval between ledger retention sweeps, in seconds
    pub sweep_interval_secs: Option<u64>,

    /// State-file directory
    pub data_dir: Option<PathBuf>,
}

/// Load the TOML config file from `path`, or the standard path if `None`
///
/// Returns `WardenConfigFile::default()` if the file doesn't exist or
/// can't be parsed.
#[must_use]
pub fn load_config_file(path: Option<&Path>) -> WardenConfigFile {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_file_path() {
            Some(p) => p,
            None => return WardenConfigFile::default(),
        },
    };

    if !path.exists() {
        return WardenConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                WardenConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            WardenConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/omni/warden/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("omni")
            .join("warden")
            .join("config.toml")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let toml = r#"
            [[watch]]
            chat_id = -1001234567890
            thread_id = 1362

            [limits]
            default_cooldown_secs = 43200
            notice_ttl_secs = 15

            [runtime]
            sweep_interval_secs = 600
        "#;
        let file: WardenConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(file.watch.len(), 1);
        assert_eq!(file.watch[0].thread_id, 1362);
        assert_eq!(file.limits.default_cooldown_secs, Some(43_200));
        assert_eq!(file.limits.notice_ttl_secs, Some(15));
        assert_eq!(file.runtime.sweep_interval_secs, Some(600));
        assert_eq!(file.runtime.poll_error_backoff_secs, None);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file: WardenConfigFile = toml::from_str("").unwrap();
        assert!(file.watch.is_empty());
        assert!(file.limits.default_cooldown_secs.is_none());
    }
}
