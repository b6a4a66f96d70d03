// FinChat Core Library - backend client and streaming chat session
// Three-layer architecture: Util -> Infrastructure -> Agentic

pub mod agentic; // Agentic layer - streaming chat session state machine
pub mod infrastructure; // Infrastructure layer - HTTP client, SSE framing, config
pub mod util; // Utility layer - message types, errors

// Export main types
pub use util::errors::*;
pub use util::types::*;

// Export infrastructure components
pub use infrastructure::{
    api::{ChatBackend, FinChatApiClient},
    config::ClientConfig,
};

// Export session core types
pub use agentic::session::{
    welcome_message, ChatSession, RejectReason, SessionEvent, SessionView, TurnOutcome, TurnPhase,
    FALLBACK_REPLY,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CORE_NAME: &str = "FinChat Core";
