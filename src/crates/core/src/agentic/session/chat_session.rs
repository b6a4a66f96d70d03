//! Streaming chat session
//!
//! Sends one user turn at a time to a [`ChatBackend`] and folds the streamed
//! reply into the conversation history.

use super::types::*;
use crate::infrastructure::api::{ChatBackend, ChatRequest};
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::stream::{frame_lines, parse_event_line, ChatStreamEvent};
use crate::util::errors::FinChatError;
use crate::util::types::ChatMessage;
use futures::StreamExt;
use log::{debug, error, info, warn};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

enum TurnEnd {
    Done,
    Failed(FinChatError),
    Cancelled,
}

pub struct ChatSession<B> {
    backend: B,
    chat_model: String,
    stream_idle_timeout: Duration,
    max_line_length: usize,
    /// Single source of truth for phase, history and busy state.
    view: watch::Sender<SessionView>,
    event_sink: Option<mpsc::UnboundedSender<SessionEvent>>,
    /// Cancelled on shutdown or drop; every turn token is a child of it.
    session_token: CancellationToken,
    turn_token: Mutex<Option<CancellationToken>>,
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(backend: B, config: &ClientConfig) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        Self {
            backend,
            chat_model: config.chat_model.clone(),
            stream_idle_timeout: config.stream_idle_timeout,
            max_line_length: config.max_line_length,
            view,
            event_sink: None,
            session_token: CancellationToken::new(),
            turn_token: Mutex::new(None),
        }
    }

    /// Seed the history with an assistant greeting.
    pub fn with_greeting(self, greeting: impl Into<String>) -> Self {
        let greeting = ChatMessage::assistant(greeting);
        self.view.send_modify(|view| view.history.push(greeting));
        self
    }

    pub fn with_event_sink(mut self, sink: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.view.borrow().history.clone()
    }

    pub fn in_flight(&self) -> String {
        self.view.borrow().in_flight.clone()
    }

    pub fn phase(&self) -> TurnPhase {
        self.view.borrow().phase
    }

    pub fn is_busy(&self) -> bool {
        self.view.borrow().is_busy()
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    /// Cancel the active turn, if any. Returns whether a turn was cancelled.
    pub fn cancel_turn(&self) -> bool {
        match self.lock_turn_token().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel the active turn and refuse further submissions.
    pub fn shutdown(&self) {
        debug!("Shutting down chat session");
        self.session_token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.session_token.is_cancelled()
    }

    /// Submit one user turn and consume the reply stream to its end.
    ///
    /// Blank input, a turn already in flight, or a closed session reject the
    /// submission without touching history or contacting the backend.
    pub async fn submit_turn(&self, user_text: &str, subject: &str) -> TurnOutcome {
        let text = user_text.trim();
        if text.is_empty() {
            debug!("Ignoring blank chat message");
            return TurnOutcome::Rejected(RejectReason::EmptyMessage);
        }
        if self.is_closed() {
            return TurnOutcome::Rejected(RejectReason::Closed);
        }

        // Claimed and published under one watch lock: a busy session always
        // has a busy view.
        let user_message = ChatMessage::user(text);
        let claimed = self.view.send_if_modified(|view| {
            if view.is_busy() {
                return false;
            }
            view.history.push(user_message.clone());
            view.in_flight.clear();
            view.phase = TurnPhase::Sending;
            true
        });
        if !claimed {
            debug!("Ignoring chat message while a turn is in flight");
            return TurnOutcome::Rejected(RejectReason::Busy);
        }

        let turn_token = self.session_token.child_token();
        *self.lock_turn_token() = Some(turn_token.clone());
        let _guard = TurnGuard { session: self };

        self.emit(SessionEvent::TurnStarted { user_message });

        let request = ChatRequest {
            message: text.to_string(),
            stock_name: subject.to_string(),
            chat_model: self.chat_model.clone(),
        };
        let end = self.run_turn(request, &turn_token).await;
        self.finish_turn(end)
    }

    async fn run_turn(&self, request: ChatRequest, token: &CancellationToken) -> TurnEnd {
        let body = tokio::select! {
            biased;
            _ = token.cancelled() => return TurnEnd::Cancelled,
            result = self.backend.open_chat_stream(request) => match result {
                Ok(body) => body,
                Err(e) => return TurnEnd::Failed(e),
            },
        };

        self.view.send_modify(|view| view.phase = TurnPhase::Streaming);
        self.emit(SessionEvent::StreamOpened);

        let mut lines = frame_lines(body, self.max_line_length);
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return TurnEnd::Cancelled,
                next = timeout(self.stream_idle_timeout, lines.next()) => next,
            };
            let line = match next {
                Ok(Some(Ok(line))) => line,
                Ok(Some(Err(e))) => return TurnEnd::Failed(e),
                Ok(None) => return TurnEnd::Failed(FinChatError::StreamClosed),
                Err(_) => {
                    return TurnEnd::Failed(FinChatError::StreamTimeout(
                        self.stream_idle_timeout.as_secs(),
                    ))
                }
            };

            let Some(event) = parse_event_line(&line) else {
                continue;
            };
            match event {
                ChatStreamEvent::Content(delta) => {
                    self.view.send_modify(|view| view.in_flight.push_str(&delta));
                    self.emit(SessionEvent::ReplyDelta { delta });
                }
                ChatStreamEvent::Error(message) => {
                    return TurnEnd::Failed(FinChatError::Backend(message));
                }
                ChatStreamEvent::Done => return TurnEnd::Done,
            }
        }
    }

    fn finish_turn(&self, end: TurnEnd) -> TurnOutcome {
        match end {
            TurnEnd::Done => {
                let mut reply = ChatMessage::assistant(String::new());
                self.view.send_modify(|view| {
                    reply.content = std::mem::take(&mut view.in_flight);
                    view.history.push(reply.clone());
                    view.phase = TurnPhase::Idle;
                });
                info!("Chat turn completed: reply_len={}", reply.content.len());
                self.emit(SessionEvent::TurnCompleted {
                    reply: reply.clone(),
                });
                TurnOutcome::Completed(reply)
            }
            TurnEnd::Failed(e) => {
                error!("Chat turn failed: {}", e);
                self.view.send_modify(|view| {
                    view.in_flight.clear();
                    view.history.push(ChatMessage::assistant(FALLBACK_REPLY));
                    view.phase = TurnPhase::Idle;
                });
                self.emit(SessionEvent::TurnFailed {
                    reason: e.to_string(),
                });
                TurnOutcome::Failed(e)
            }
            TurnEnd::Cancelled => {
                warn!("Chat turn cancelled");
                self.view.send_modify(|view| {
                    view.in_flight.clear();
                    view.phase = TurnPhase::Idle;
                });
                self.emit(SessionEvent::TurnCancelled);
                TurnOutcome::Cancelled
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(sink) = &self.event_sink {
            let _ = sink.send(event);
        }
    }
}

impl<B> ChatSession<B> {
    fn lock_turn_token(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.turn_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B> Drop for ChatSession<B> {
    fn drop(&mut self) {
        self.session_token.cancel();
    }
}

/// Returns the session to idle when a turn ends, including when the
/// `submit_turn` future is dropped mid-stream.
struct TurnGuard<'a, B> {
    session: &'a ChatSession<B>,
}

impl<B> Drop for TurnGuard<'_, B> {
    fn drop(&mut self) {
        self.session.lock_turn_token().take();
        self.session.view.send_if_modified(|view| {
            if view.phase == TurnPhase::Idle && view.in_flight.is_empty() {
                return false;
            }
            view.in_flight.clear();
            view.phase = TurnPhase::Idle;
            true
        });
    }
}
