//! Wire types for the FinChat backend API

use crate::util::errors::{FinChatError, FinChatResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// Selected subject, passed through without validation.
    pub stock_name: String,
    pub chat_model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ModelList {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    pub stock_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub chat_model: String,
}

impl AnalysisRequest {
    pub fn new(
        stock_name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        chat_model: impl Into<String>,
    ) -> FinChatResult<Self> {
        let stock_name = stock_name.into();
        if stock_name.trim().is_empty() {
            return Err(FinChatError::validation("stock name must not be empty"));
        }
        if start_date > end_date {
            return Err(FinChatError::validation(format!(
                "start date {} is after end date {}",
                start_date, end_date
            )));
        }
        Ok(Self {
            stock_name,
            start_date,
            end_date,
            chat_model: chat_model.into(),
        })
    }
}

/// Parse a `YYYY-MM-DD` date as accepted by the analyze endpoint.
pub fn parse_date(value: &str) -> FinChatResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| FinChatError::validation(format!("invalid date '{}': {}", value, e)))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisReport {
    pub status: String,
    /// Markdown report body.
    pub report: String,
}

/// Error body returned alongside non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
