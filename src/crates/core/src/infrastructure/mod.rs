//! Infrastructure layer
//!
//! HTTP access to the FinChat backend, SSE line framing, and client configuration

pub mod api;
pub mod config;
pub mod stream;

pub use api::{ChatBackend, ChatByteStream, FinChatApiClient};
pub use config::ClientConfig;
pub use stream::{frame_lines, parse_event_line, ChatStreamEvent};
