//! Session facade: the public surface of the assistant conversation.
//!
//! The host constructs one `AssistantSession` per assistant panel, injects
//! its context blob and action callback, and renders from `messages()` and
//! `is_busy()`. History lives only for the lifetime of the session object;
//! persistence, if wanted, belongs to the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use decora_common::SessionId;

use crate::bridge::{ActionBridge, ActionCallback, ActionHandle};
use crate::dispatcher::Dispatcher;
use crate::message::{Message, MessageLog};
use crate::{AttachmentUpload, Backend};

/// Synthetic assistant greeting used to seed an empty session.
const GREETING: &str =
    "Hi! I'm your Decora design assistant. Ask me anything about your space, \
     or try one of the ideas below.";

/// Default follow-ups carried on the greeting message.
const GREETING_SUGGESTIONS: [&str; 4] = [
    "Optimize my kitchen layout",
    "Suggest a color palette for my living room",
    "Rework the lighting in my home office",
    "Make a small bedroom feel larger",
];

/// A single-user, in-memory assistant conversation.
///
/// All entry points are async and never block the host's event loop; the
/// in-flight flag is exposed for loading indicators. Submissions while a
/// request is outstanding are refused, not queued.
pub struct AssistantSession {
    id: SessionId,
    log: MessageLog,
    dispatcher: Dispatcher,
    bridge: ActionBridge,
    host_context: serde_json::Value,
    in_flight: Arc<AtomicBool>,
}

impl AssistantSession {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let id = SessionId::new();
        let log = MessageLog::new();
        let in_flight = Arc::new(AtomicBool::new(false));
        let dispatcher = Dispatcher::new(backend, log.clone(), in_flight.clone(), id.clone());
        Self {
            id,
            log,
            dispatcher,
            bridge: ActionBridge::new(Arc::new(|_| {})),
            host_context: serde_json::Value::Null,
            in_flight,
        }
    }

    /// Opaque application context sent with every chat turn.
    pub fn with_host_context(mut self, context: serde_json::Value) -> Self {
        self.host_context = context;
        self
    }

    /// Host callback receiving action payloads on invoke.
    pub fn with_action_callback(mut self, on_apply: ActionCallback) -> Self {
        self.bridge = ActionBridge::new(on_apply);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.id
    }

    /// Snapshot of the conversation in insertion order.
    pub async fn messages(&self) -> Vec<Message> {
        self.log.snapshot().await
    }

    /// Whether a chat turn or attachment analysis is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Seed the greeting message. Idempotent: applies only while the
    /// history is empty.
    pub async fn seed_greeting(&self) {
        let greeting = Message::assistant(GREETING).with_suggestions(
            GREETING_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        );
        if !self.log.seed(greeting).await {
            debug!(session = %self.id, "greeting seed skipped: history not empty");
        }
    }

    /// Submit one chat turn. Silent no-op when the trimmed input is empty
    /// or a request is already in flight.
    pub async fn submit_text(&self, text: &str) {
        self.dispatcher.send_chat_turn(text, &self.host_context).await;
    }

    /// Upload a file for analysis. Same gating as [`Self::submit_text`].
    pub async fn submit_attachment(&self, upload: AttachmentUpload) {
        self.dispatcher.analyze_attachment(upload).await;
    }

    /// Selecting a suggestion is exactly the user typing and submitting it.
    pub async fn select_suggestion(&self, suggestion: &str) {
        self.submit_text(suggestion).await;
    }

    /// Invocable handles for the actions carried on an assistant message.
    pub fn actions_for(&self, message: &Message) -> Vec<ActionHandle> {
        self.bridge.handles_for(message)
    }

    /// Hand the action's payload to the host callback.
    pub fn invoke_action(&self, handle: &ActionHandle) {
        self.bridge.invoke(handle);
    }

    /// End the session. History is discarded, never persisted here.
    pub fn close(self) {
        info!(session = %self.id, "assistant session closed");
    }
}
