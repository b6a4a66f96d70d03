//! Error types shared across the FinChat core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinChatError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Stream closed before the reply completed")]
    StreamClosed,

    #[error("Stream idle for {0}s without data")]
    StreamTimeout(u64),

    #[error("Chat turn failed: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type FinChatResult<T> = Result<T, FinChatError>;

impl FinChatError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the failure happened before a byte stream was obtained.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }
}
