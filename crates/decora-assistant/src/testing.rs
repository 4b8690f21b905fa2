//! Scripted backend used by dispatcher and session tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    AnalysisResponse, AttachmentUpload, Backend, BackendError, ChatTurnRequest, ChatTurnResponse,
};

/// Backend double that replays queued replies and records requests.
/// `hold_chat` makes chat calls wait for a notification, so tests can
/// observe in-flight state.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    chat_replies: Mutex<VecDeque<Result<ChatTurnResponse, BackendError>>>,
    analysis_replies: Mutex<VecDeque<Result<AnalysisResponse, BackendError>>>,
    chat_requests: Mutex<Vec<ChatTurnRequest>>,
    analyze_calls: AtomicUsize,
    hold: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_chat(&self, reply: Result<ChatTurnResponse, BackendError>) {
        self.chat_replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_analysis(&self, reply: Result<AnalysisResponse, BackendError>) {
        self.analysis_replies.lock().unwrap().push_back(reply);
    }

    /// Make every subsequent chat call block until the returned handle is
    /// notified.
    pub(crate) fn hold_chat(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub(crate) fn chat_requests(&self) -> Vec<ChatTurnRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    pub(crate) fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn chat(&self, request: ChatTurnRequest) -> Result<ChatTurnResponse, BackendError> {
        self.chat_requests.lock().unwrap().push(request);
        let hold = self.hold.lock().unwrap().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Api("no scripted chat reply".into())))
    }

    async fn analyze(&self, _upload: AttachmentUpload) -> Result<AnalysisResponse, BackendError> {
        self.analyze_calls.fetch_add(1, Ordering::Relaxed);
        self.analysis_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Api("no scripted analysis reply".into())))
    }
}
