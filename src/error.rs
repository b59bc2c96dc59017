//! Recallbox error types

use thiserror::Error;

/// Recallbox error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel adapter error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Outbound send failed
    #[error("Send error: {0}")]
    Send(String),

    /// Media could not be downloaded or re-requested
    #[error("Media recovery error: {0}")]
    MediaRecovery(String),

    /// Media reference has expired on the host and needs a re-upload request
    #[error("Media expired: {0}")]
    MediaExpired(String),

    /// Envelope could not be interpreted
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Config file parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for Recallbox operations
pub type Result<T> = std::result::Result<T, Error>;
