//! Error types for the warden

use thiserror::Error;

/// Result type alias for warden operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the warden
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// State persistence error (write failures; corrupt reads fall back to defaults)
    #[error("store error: {0}")]
    Store(String),

    /// Telegram channel error
    #[error("channel error: {0}")]
    Channel(String),

    /// Chat-admin roster lookup failure (transient; callers degrade, never crash)
    #[error("admin lookup error: {0}")]
    AdminLookup(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
