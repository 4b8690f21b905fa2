//! Request dispatcher: serializes backend calls and maps replies (or
//! failures) onto new log entries.
//!
//! Exactly one chat-turn or attachment-analysis request may be outstanding;
//! both request kinds share one in-flight gate. Unbounded concurrent turns
//! would race on which context window was current and could interleave
//! assistant replies out of causal order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use decora_common::SessionId;

use crate::context::{context_window, DEFAULT_CONTEXT_WINDOW};
use crate::message::{Attachment, AttachmentKind, Message, MessageLog};
use crate::{AttachmentUpload, Backend, ChatTurnRequest, HistoryEntry};

/// Fixed user-safe reply appended when a chat turn fails. The real error is
/// logged, never shown verbatim.
pub(crate) const CHAT_FAILURE_REPLY: &str =
    "Sorry, I ran into a problem answering that. Please try again in a moment.";

/// Guard that clears the in-flight flag on drop, so the flag is released
/// even if the future is cancelled or an early return occurs.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    /// Attempt to take the gate. `None` when a request is already outstanding.
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }
        Some(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Issues backend requests for one session and appends the results.
/// The only writer of the message log apart from the greeting seed.
pub(crate) struct Dispatcher {
    backend: Arc<dyn Backend>,
    log: MessageLog,
    in_flight: Arc<AtomicBool>,
    session: SessionId,
}

impl Dispatcher {
    pub(crate) fn new(
        backend: Arc<dyn Backend>,
        log: MessageLog,
        in_flight: Arc<AtomicBool>,
        session: SessionId,
    ) -> Self {
        Self {
            backend,
            log,
            in_flight,
            session,
        }
    }

    /// One chat turn: optimistic user append, backend call, assistant append.
    /// Empty input and in-flight refusals are silent no-ops.
    pub(crate) async fn send_chat_turn(&self, text: &str, host_context: &serde_json::Value) {
        let text = text.trim();
        if text.is_empty() {
            debug!(session = %self.session, "ignoring empty chat input");
            return;
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!(session = %self.session, "chat turn refused: request in flight");
            return;
        };

        // Window over the prior history only; the new turn travels in its
        // own request field.
        let history = self.log.snapshot().await;
        let window: Vec<HistoryEntry> = context_window(&history, DEFAULT_CONTEXT_WINDOW)
            .iter()
            .map(HistoryEntry::from)
            .collect();

        self.log.append(Message::user(text)).await;

        let request = ChatTurnRequest {
            message: text.to_string(),
            context: host_context.clone(),
            history: window,
        };

        match self.backend.chat(request).await {
            Ok(reply) => {
                let message = Message::assistant(reply.message)
                    .with_suggestions(reply.suggestions)
                    .with_actions(reply.actions.into_iter().map(Into::into).collect());
                self.log.append(message).await;
            }
            Err(err) => {
                warn!(session = %self.session, error = %err, "chat turn failed");
                self.log.append(Message::assistant(CHAT_FAILURE_REPLY)).await;
            }
        }
    }

    /// Upload one file for analysis. On success the user upload message and
    /// the assistant analysis land as one atomic pair; on failure nothing is
    /// appended and the error is only logged.
    pub(crate) async fn analyze_attachment(&self, upload: AttachmentUpload) {
        if upload.file_name.trim().is_empty() || upload.bytes.is_empty() {
            debug!(session = %self.session, "ignoring empty attachment upload");
            return;
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!(session = %self.session, "attachment analysis refused: request in flight");
            return;
        };

        let file_name = upload.file_name.clone();

        match self.backend.analyze(upload).await {
            Ok(reply) => {
                let attachment = Attachment {
                    kind: AttachmentKind::Image,
                    locator: format!("attachment://{}", uuid::Uuid::new_v4()),
                    display_name: file_name.clone(),
                };
                let user = Message::user_with_attachment(file_name, attachment);
                let assistant =
                    Message::assistant(reply.analysis).with_suggestions(reply.suggestions);
                self.log.append_pair(user, assistant).await;
            }
            Err(err) => {
                warn!(session = %self.session, error = %err, "attachment analysis failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;
    use crate::{AnalysisResponse, BackendError, ChatTurnResponse, Role};

    fn dispatcher(backend: Arc<ScriptedBackend>) -> (Dispatcher, MessageLog) {
        let log = MessageLog::new();
        let dispatcher = Dispatcher::new(
            backend,
            log.clone(),
            Arc::new(AtomicBool::new(false)),
            SessionId::new(),
        );
        (dispatcher, log)
    }

    fn reply(message: &str) -> ChatTurnResponse {
        ChatTurnResponse {
            message: message.to_string(),
            suggestions: Vec::new(),
            actions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn successful_turn_appends_user_then_assistant() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_chat(Ok(reply("Here are ideas")));
        let (dispatcher, log) = dispatcher(backend);

        dispatcher
            .send_chat_turn("Optimize my kitchen layout", &serde_json::Value::Null)
            .await;

        let history = log.snapshot().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "Optimize my kitchen layout");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "Here are ideas");
    }

    #[tokio::test]
    async fn user_message_is_visible_before_the_reply_resolves() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_chat(Ok(reply("done")));
        let release = backend.hold_chat();
        let (dispatcher, log) = dispatcher(backend);
        let dispatcher = Arc::new(dispatcher);

        let task = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .send_chat_turn("hello", &serde_json::Value::Null)
                    .await;
            })
        };

        while log.len().await < 1 {
            tokio::task::yield_now().await;
        }
        let history = log.snapshot().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);

        release.notify_one();
        task.await.unwrap();
        assert_eq!(log.len().await, 2);
    }

    #[tokio::test]
    async fn failed_turn_appends_apology_and_releases_gate() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_chat(Err(BackendError::Network("connection refused".into())));
        let log = MessageLog::new();
        let in_flight = Arc::new(AtomicBool::new(false));
        let dispatcher = Dispatcher::new(
            backend,
            log.clone(),
            in_flight.clone(),
            SessionId::new(),
        );

        dispatcher
            .send_chat_turn("any ideas?", &serde_json::Value::Null)
            .await;

        let history = log.snapshot().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, CHAT_FAILURE_REPLY);
        assert!(history[1].suggestions.is_empty());
        assert!(history[1].actions.is_empty());
        assert!(!in_flight.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let backend = Arc::new(ScriptedBackend::new());
        let (dispatcher, log) = dispatcher(backend.clone());

        dispatcher.send_chat_turn("   ", &serde_json::Value::Null).await;

        assert!(log.is_empty().await);
        assert!(backend.chat_requests().is_empty());
    }

    #[tokio::test]
    async fn request_carries_window_of_prior_history_only() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_chat(Ok(reply("ok")));
        let (dispatcher, log) = dispatcher(backend.clone());

        for i in 0..12 {
            log.append(Message::user(format!("earlier {i}"))).await;
        }

        dispatcher
            .send_chat_turn("the new turn", &serde_json::json!({"project": "loft"}))
            .await;

        let requests = backend.chat_requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(sent.message, "the new turn");
        assert_eq!(sent.context, serde_json::json!({"project": "loft"}));
        assert_eq!(sent.history.len(), DEFAULT_CONTEXT_WINDOW);
        assert_eq!(sent.history[0].content, "earlier 2");
        assert_eq!(sent.history[9].content, "earlier 11");
        assert!(sent.history.iter().all(|h| h.content != "the new turn"));
    }

    #[tokio::test]
    async fn analysis_success_appends_upload_and_reply_as_a_pair() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_analysis(Ok(AnalysisResponse {
            analysis: "A bright, narrow galley kitchen.".into(),
            suggestions: vec!["Widen the walkway".into()],
        }));
        let (dispatcher, log) = dispatcher(backend);

        dispatcher
            .analyze_attachment(AttachmentUpload {
                file_name: "kitchen.png".into(),
                bytes: vec![0x89, 0x50, 0x4e, 0x47],
            })
            .await;

        let history = log.snapshot().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].attachments.len(), 1);
        let attachment = &history[0].attachments[0];
        assert_eq!(attachment.kind, AttachmentKind::Image);
        assert_eq!(attachment.display_name, "kitchen.png");
        assert!(attachment.locator.starts_with("attachment://"));
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "A bright, narrow galley kitchen.");
        assert_eq!(history[1].suggestions, vec!["Widen the walkway"]);
    }

    #[tokio::test]
    async fn analysis_failure_appends_nothing() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_analysis(Err(BackendError::Api("HTTP 500: boom".into())));
        let log = MessageLog::new();
        let in_flight = Arc::new(AtomicBool::new(false));
        let dispatcher = Dispatcher::new(
            backend,
            log.clone(),
            in_flight.clone(),
            SessionId::new(),
        );

        dispatcher
            .analyze_attachment(AttachmentUpload {
                file_name: "kitchen.png".into(),
                bytes: vec![1, 2, 3],
            })
            .await;

        assert!(log.is_empty().await);
        assert!(!in_flight.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn missing_file_is_a_no_op() {
        let backend = Arc::new(ScriptedBackend::new());
        let (dispatcher, log) = dispatcher(backend.clone());

        dispatcher
            .analyze_attachment(AttachmentUpload {
                file_name: "empty.png".into(),
                bytes: Vec::new(),
            })
            .await;
        dispatcher
            .analyze_attachment(AttachmentUpload {
                file_name: "  ".into(),
                bytes: vec![1],
            })
            .await;

        assert!(log.is_empty().await);
        assert_eq!(backend.analyze_calls(), 0);
    }
}
