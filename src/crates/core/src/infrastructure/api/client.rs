//! HTTP client for the FinChat backend

use super::types::{AnalysisReport, AnalysisRequest, ChatRequest, ErrorDetail, ModelInfo, ModelList};
use crate::infrastructure::config::ClientConfig;
use crate::util::errors::{FinChatError, FinChatResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, error, warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Response;
use tokio::time::timeout;

const EVENT_STREAM_MIME_TYPE: &str = "text/event-stream";
const CHAT_PATH: &str = "/api/chat";
const MODELS_PATH: &str = "/api/models";
const ANALYZE_PATH: &str = "/api/analyze";

/// Raw reply body of a chat turn.
pub type ChatByteStream = BoxStream<'static, FinChatResult<Bytes>>;

/// The collaborator a chat session sends turns to.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Issue the turn and return the reply body once response headers arrived.
    ///
    /// Rejected requests and non-success statuses are errors; nothing is
    /// streamed in that case.
    async fn open_chat_stream(&self, request: ChatRequest) -> FinChatResult<ChatByteStream>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for std::sync::Arc<T> {
    async fn open_chat_stream(&self, request: ChatRequest) -> FinChatResult<ChatByteStream> {
        (**self).open_chat_stream(request).await
    }
}

#[derive(Debug, Clone)]
pub struct FinChatApiClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl FinChatApiClient {
    pub fn new(config: ClientConfig) -> FinChatResult<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .user_agent(format!("finchat/{}", crate::VERSION))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Models the backend can answer with (`GET /api/models`).
    pub async fn list_models(&self) -> FinChatResult<Vec<ModelInfo>> {
        let url = self.config.endpoint(MODELS_PATH);
        debug!("Listing models: url={}", url);
        let response = self
            .client
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        let list: ModelList = response.json().await?;
        Ok(list.models)
    }

    /// Generate a stock analysis report (`POST /api/analyze`).
    ///
    /// Report generation runs an agent on the backend and can take minutes,
    /// so only the connect timeout applies.
    pub async fn analyze_stock(&self, request: &AnalysisRequest) -> FinChatResult<AnalysisReport> {
        let url = self.config.endpoint(ANALYZE_PATH);
        debug!(
            "Requesting analysis: stock={}, range={}..{}, model={}",
            request.stock_name, request.start_date, request.end_date, request.chat_model
        );
        let response = self.client.post(&url).json(request).send().await?;
        let response = check_status(response).await?;
        let report: AnalysisReport = response.json().await?;
        if report.status != "success" {
            warn!("Analysis returned status={}", report.status);
            return Err(FinChatError::Backend(format!(
                "analysis finished with status '{}'",
                report.status
            )));
        }
        Ok(report)
    }
}

#[async_trait]
impl ChatBackend for FinChatApiClient {
    async fn open_chat_stream(&self, request: ChatRequest) -> FinChatResult<ChatByteStream> {
        let url = self.config.endpoint(CHAT_PATH);
        debug!(
            "Sending chat turn: url={}, stock={}, model={}",
            url, request.stock_name, request.chat_model
        );

        let send = self
            .client
            .post(&url)
            .header(ACCEPT, EVENT_STREAM_MIME_TYPE)
            .json(&request)
            .send();
        let response = match timeout(self.config.request_timeout, send).await {
            Ok(result) => result?,
            Err(_) => {
                let secs = self.config.request_timeout.as_secs();
                error!("Chat request timed out waiting for response headers after {}s", secs);
                return Err(FinChatError::Stream(format!(
                    "no response headers after {}s",
                    secs
                )));
            }
        };
        let response = check_status(response).await?;

        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            if !content_type.as_bytes().starts_with(EVENT_STREAM_MIME_TYPE.as_bytes()) {
                // Line framing still applies; some proxies rewrite the header.
                warn!(
                    "Chat reply has unexpected content type: {}",
                    String::from_utf8_lossy(content_type.as_bytes())
                );
            }
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(FinChatError::from))
            .boxed())
    }
}

async fn check_status(response: Response) -> FinChatResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorDetail>(&body) {
        Ok(detail) => detail.message(),
        Err(_) if !body.trim().is_empty() => body,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    error!("Backend request failed: status={}, message={}", status, message);
    Err(FinChatError::Status {
        status: status.as_u16(),
        message,
    })
}
