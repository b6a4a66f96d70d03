//! Session Management Layer
//!
//! Provides the streaming chat session, its observable view, and turn outcomes

pub mod chat_session;
pub mod types;

pub use chat_session::*;
pub use types::*;
