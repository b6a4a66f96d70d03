//! Client configuration

use crate::util::errors::{FinChatError, FinChatResult};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_CHAT_MODEL: &str = "deepseek-chat";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, without the `/api/...` path.
    pub base_url: String,
    /// Model selector sent as `chat_model` with every turn.
    pub chat_model: String,
    /// Connect timeout and the bound on waiting for response headers.
    pub request_timeout: Duration,
    /// Maximum silence between two reads of the reply stream.
    pub stream_idle_timeout: Duration,
    /// Lines longer than this abort the stream.
    pub max_line_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            stream_idle_timeout: Duration::from_secs(DEFAULT_STREAM_IDLE_TIMEOUT_SECS),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_chat_model(mut self, chat_model: impl Into<String>) -> Self {
        self.chat_model = chat_model.into();
        self
    }

    pub fn with_stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    pub fn validate(&self) -> FinChatResult<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| FinChatError::config(format!("invalid base_url '{}': {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FinChatError::config(format!(
                "unsupported base_url scheme: {}",
                url.scheme()
            )));
        }
        if self.chat_model.trim().is_empty() {
            return Err(FinChatError::config("chat_model must not be empty"));
        }
        if self.request_timeout.is_zero() || self.stream_idle_timeout.is_zero() {
            return Err(FinChatError::config("timeouts must be greater than zero"));
        }
        if self.max_line_length == 0 {
            return Err(FinChatError::config("max_line_length must be greater than zero"));
        }
        Ok(())
    }

    /// Join an API path onto the base URL, tolerating a trailing slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
