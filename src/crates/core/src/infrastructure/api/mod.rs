//! FinChat backend API
//!
//! Wire types and the reqwest-based client for `/api/chat`, `/api/models` and `/api/analyze`

pub mod client;
pub mod types;

pub use client::{ChatBackend, ChatByteStream, FinChatApiClient};
pub use types::{parse_date, AnalysisReport, AnalysisRequest, ChatRequest, ModelInfo};
