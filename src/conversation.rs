use crate::api::{ChatError, ChatResponse};
use crate::message::{ConversationLog, Message};

/// Assistant turn appended when the backend could not answer.
pub const CHAT_FAILURE_TEXT: &str =
    "I'm sorry, I encountered an error connecting to the brain. Please check the backend connection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingAnswer,
}

/// Turns questions into chat calls and answers into log entries.
///
/// The log itself belongs to the coordinator and is passed in on every call.
#[derive(Debug, Default)]
pub struct ConversationControl {
    state: ConversationState,
}

impl ConversationControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn is_awaiting_answer(&self) -> bool {
        self.state == ConversationState::AwaitingAnswer
    }

    /// Record a question and return the trimmed query to send.
    ///
    /// Returns `None` without touching the log for blank input or while an
    /// answer is still pending.
    pub fn submit(&mut self, log: &mut ConversationLog, raw: &str) -> Option<String> {
        let query = raw.trim();
        if query.is_empty() || self.is_awaiting_answer() {
            return None;
        }

        log.push(Message::user(raw));
        self.state = ConversationState::AwaitingAnswer;
        Some(query.to_string())
    }

    /// Append the single assistant turn for the pending question.
    pub fn resolve(&mut self, log: &mut ConversationLog, outcome: Result<ChatResponse, ChatError>) {
        if !self.is_awaiting_answer() {
            tracing::warn!("chat result arrived with no question pending, dropping it");
            return;
        }

        let reply = match outcome {
            Ok(ChatResponse { response, sources }) => {
                tracing::info!(sources = sources.len(), "answer received");
                Message::assistant_with_sources(response, sources)
            }
            Err(e) => {
                tracing::error!(error = %e, "chat request failed");
                Message::assistant(CHAT_FAILURE_TEXT)
            }
        };

        log.push(reply);
        self.state = ConversationState::Idle;
    }
}
