//! Conversation data types
//!
//! The message log is shared by the coordinator and the conversation control.
//! Nothing here depends on the terminal layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat message in the document conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            sources: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            sources: None,
        }
    }

    /// Assistant message with citations. An empty list is stored as `None`.
    pub fn assistant_with_sources(content: impl Into<String>, sources: Vec<String>) -> Self {
        let mut message = Self::assistant(content);
        if !sources.is_empty() {
            message.sources = Some(sources);
        }
        message
    }

    /// Display labels for this message's sources, in order.
    pub fn source_labels(&self) -> Vec<String> {
        self.sources
            .iter()
            .flatten()
            .map(|source| source_label(source))
            .collect()
    }
}

/// Ordered, append-only message log.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the whole log with a single message. Used when a new document is accepted.
    pub fn reset_with(&mut self, message: Message) {
        self.messages.clear();
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Trailing segment of a path, splitting on both `\` and `/`.
///
/// Bare names come back unchanged and an empty string stays empty.
pub fn basename(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Label shown for a cited source, e.g. `docs/report.pdf#page=3` -> `report.pdf#page=3 #Page`.
pub fn source_label(source: &str) -> String {
    format!("{} #Page", basename(source))
}
