//! AI design-assistant conversation session for Decora.
//!
//! Provides the in-memory session core used by the dashboard's assistant
//! panel:
//! - Append-only message history with attachments, suggestions, and actions
//! - Recency-bounded context window for backend requests
//! - A dispatcher that serializes chat-turn and attachment-analysis calls
//! - Host-facing suggestion/action bridge
//! - A session facade gated by a single in-flight flag
//!
//! The backend language-model service is reached through the [`Backend`]
//! trait; [`http::HttpBackend`] is the production implementation and tests
//! use a scripted stand-in.

pub mod bridge;
pub mod context;
pub mod dispatcher;
pub mod http;
pub mod message;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use bridge::{ActionCallback, ActionHandle};
pub use context::{context_window, DEFAULT_CONTEXT_WINDOW};
pub use decora_common::{BackendError, MessageId, SessionId};
pub use http::{BackendConfig, HttpBackend};
pub use message::{Attachment, AttachmentKind, Message, MessageAction, MessageLog};
pub use session::AssistantSession;

/// Conversational role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Reserved for non-rendered scaffolding; currently unused.
    System,
}

/// One chat turn sent to the backend. `history` is the prior context window
/// only; the new turn travels in `message`, never inside `history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub message: String,
    /// Opaque host-supplied context (project state etc.); never interpreted here.
    pub context: serde_json::Value,
    pub history: Vec<HistoryEntry>,
}

/// Role + content pair as the backend expects history entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// Backend reply to a chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub actions: Vec<ActionPayload>,
}

/// Backend-declared operation: display label plus opaque data for the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPayload {
    pub label: String,
    pub data: serde_json::Value,
}

/// A file handed to [`Backend::analyze`] as a multipart upload.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Backend reply to an attachment analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// The assistant backend service. Implementations own transport concerns
/// (timeouts, retries); callers treat every failure uniformly.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn chat(&self, request: ChatTurnRequest) -> Result<ChatTurnResponse, BackendError>;

    async fn analyze(&self, upload: AttachmentUpload) -> Result<AnalysisResponse, BackendError>;
}
