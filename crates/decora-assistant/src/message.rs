//! Message model and the append-only session log.
//!
//! The log is the ground truth the rest of the session reads and writes.
//! Entries are never edited, removed, or reordered after creation; a failed
//! request appends a terminal assistant message instead of rewriting history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use decora_common::{new_message_id, MessageId};

use crate::{ActionPayload, Role};

/// What kind of blob an attachment references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

/// Reference to an uploaded blob shown alongside a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    /// Addressable reference to the blob (locally derived for uploads).
    pub locator: String,
    pub display_name: String,
}

/// Backend-declared action carried on an assistant message. The payload is
/// opaque data handed back to the host on invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAction {
    pub label: String,
    pub payload: serde_json::Value,
}

impl From<ActionPayload> for MessageAction {
    fn from(action: ActionPayload) -> Self {
        Self {
            label: action.label,
            payload: action.data,
        }
    }
}

/// One conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Advisory follow-up prompts; assistant messages only, never auto-submitted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<MessageAction>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            attachments: Vec::new(),
            suggestions: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// A user message created from an upload flow, carrying one attachment.
    pub fn user_with_attachment(content: impl Into<String>, attachment: Attachment) -> Self {
        let mut msg = Self::new(Role::User, content);
        msg.attachments.push(attachment);
        msg
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Attach follow-up suggestions. Only meaningful on assistant messages.
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        debug_assert_eq!(self.role, Role::Assistant);
        self.suggestions = suggestions;
        self
    }

    /// Attach backend-declared actions. Only meaningful on assistant messages.
    pub fn with_actions(mut self, actions: Vec<MessageAction>) -> Self {
        debug_assert_eq!(self.role, Role::Assistant);
        self.actions = actions;
        self
    }
}

/// Append-only ordered log of messages for one session.
///
/// Cheap to clone (shared handle). Readers get snapshot semantics: a
/// [`MessageLog::snapshot`] is a point-in-time copy and never mutates under
/// the caller. All writes go through the dispatcher and the greeting seed.
#[derive(Clone, Default)]
pub struct MessageLog {
    inner: Arc<RwLock<Vec<Message>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, message: Message) {
        self.inner.write().await.push(message);
    }

    /// Append two messages in one update: observers see both or neither.
    /// Used by attachment analysis (user upload + assistant analysis).
    pub async fn append_pair(&self, first: Message, second: Message) {
        let mut guard = self.inner.write().await;
        guard.push(first);
        guard.push(second);
    }

    /// Append only when the log is still empty. Returns whether the message
    /// was inserted. Backs the idempotent greeting seed.
    pub async fn seed(&self, message: Message) -> bool {
        let mut guard = self.inner.write().await;
        if guard.is_empty() {
            guard.push(message);
            true
        } else {
            false
        }
    }

    /// Point-in-time copy of the full history, in insertion order.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
