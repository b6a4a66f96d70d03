use crate::util::errors::FinChatError;
use crate::util::types::ChatMessage;
use serde::Serialize;

/// Assistant text recorded in place of a reply that could not be completed.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong while processing your message.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    #[default]
    Idle,
    /// Request issued, response headers not yet received.
    Sending,
    /// Reading the reply body.
    Streaming,
}

/// Snapshot published to observers after every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub phase: TurnPhase,
    pub history: Vec<ChatMessage>,
    /// Reply text received so far for the active turn.
    pub in_flight: String,
}

impl SessionView {
    pub fn is_busy(&self) -> bool {
        self.phase != TurnPhase::Idle
    }
}

/// Per-event notifications, one `ReplyDelta` for every `content` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TurnStarted { user_message: ChatMessage },
    StreamOpened,
    ReplyDelta { delta: String },
    TurnCompleted { reply: ChatMessage },
    TurnFailed { reason: String },
    TurnCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyMessage,
    Busy,
    Closed,
}

#[derive(Debug)]
pub enum TurnOutcome {
    /// The assistant reply appended to history.
    Completed(ChatMessage),
    /// The turn failed; history ends with [`FALLBACK_REPLY`].
    Failed(FinChatError),
    Cancelled,
    /// Nothing was submitted.
    Rejected(RejectReason),
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed(_))
    }
}

/// Greeting shown before the first turn.
pub fn welcome_message(subject: Option<&str>) -> String {
    let selection = match subject.map(str::trim).filter(|s| !s.is_empty()) {
        Some(subject) => format!("Currently selected stock: {}", subject),
        None => "Select a stock to start an analysis.".to_string(),
    };
    format!(
        "Welcome to FinChat, your stock analysis assistant!\n\n\
         Ask any question about a stock below. Answers are grounded in financial \
         data the backend agent retrieves for you.\n\n\
         You can also request a full analysis report for a stock and date range.\n\
         {}",
        selection
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_view_is_idle_and_empty() {
        let view = SessionView::default();
        assert!(!view.is_busy());
        assert!(view.history.is_empty());
        assert!(view.in_flight.is_empty());
    }

    #[test]
    fn welcome_mentions_selected_subject() {
        assert!(welcome_message(Some("600519")).ends_with("Currently selected stock: 600519"));
        assert!(welcome_message(Some("  ")).ends_with("Select a stock to start an analysis."));
        assert!(welcome_message(None).ends_with("Select a stock to start an analysis."));
    }
}
