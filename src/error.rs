//! Error types for the valet agent

use thiserror::Error;

/// Result type alias for valet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the valet agent
#[derive(Debug, Error)]
pub enum Error {
    /// Capture device failure. The only fatal error kind: the session
    /// cannot continue without a microphone.
    #[error("audio device error: {0}")]
    Device(String),

    /// Speech-to-text failure; the turn becomes an empty transcript
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Language-model backend unreachable or rejected the request
    #[error("backend error: {0}")]
    Backend(String),

    /// Model response could not be parsed as an action
    #[error("parse error: {0}")]
    Parse(String),

    /// Tool handler failure, converted to a spoken result at the dispatch boundary
    #[error("tool error: {0}")]
    Tool(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio processing error
    #[error("audio error: {0}")]
    Audio(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

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

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Whether this error should terminate the session rather than be
    /// converted into a spoken outcome.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Device(_))
    }
}
