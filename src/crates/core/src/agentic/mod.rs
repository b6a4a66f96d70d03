//! Agentic layer
//!
//! Conversation sessions driven by the backend's streamed replies

pub mod session;

pub use session::*;
