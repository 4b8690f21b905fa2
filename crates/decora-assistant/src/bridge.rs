//! Suggestion and action bridge between assistant replies and the host.
//!
//! Suggestions are literal re-submittable prompts: selecting one is exactly
//! the user typing that text. Actions are labeled triggers whose payloads
//! pass through to the host callback untouched; the session core never
//! interprets them.

use std::sync::Arc;

use tracing::debug;

use crate::message::Message;

/// Host-supplied callback receiving an action's opaque payload on invoke.
pub type ActionCallback = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// A host-invocable operation surfaced alongside an assistant reply.
/// The label is for display only.
#[derive(Debug, Clone)]
pub struct ActionHandle {
    pub label: String,
    payload: serde_json::Value,
}

/// Hands assistant-declared affordances to the host.
pub(crate) struct ActionBridge {
    on_apply: ActionCallback,
}

impl ActionBridge {
    pub(crate) fn new(on_apply: ActionCallback) -> Self {
        Self { on_apply }
    }

    /// Invocable handles for the actions carried on `message`.
    pub(crate) fn handles_for(&self, message: &Message) -> Vec<ActionHandle> {
        message
            .actions
            .iter()
            .map(|action| ActionHandle {
                label: action.label.clone(),
                payload: action.payload.clone(),
            })
            .collect()
    }

    /// Pass the action's payload to the host. Pure pass-through.
    pub(crate) fn invoke(&self, handle: &ActionHandle) {
        debug!(label = %handle.label, "invoking assistant action");
        (self.on_apply)(handle.payload.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageAction;
    use std::sync::Mutex;

    fn recording_bridge() -> (ActionBridge, Arc<Mutex<Vec<serde_json::Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let bridge = ActionBridge::new(Arc::new(move |payload| {
            sink.lock().unwrap().push(payload);
        }));
        (bridge, received)
    }

    #[test]
    fn handles_mirror_message_actions_in_order() {
        let (bridge, _) = recording_bridge();
        let message = Message::assistant("reply").with_actions(vec![
            MessageAction {
                label: "Apply palette".into(),
                payload: serde_json::json!({"palette": "warm"}),
            },
            MessageAction {
                label: "Add to moodboard".into(),
                payload: serde_json::json!({"board": 3}),
            },
        ]);

        let handles = bridge.handles_for(&message);
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].label, "Apply palette");
        assert_eq!(handles[1].label, "Add to moodboard");
    }

    #[test]
    fn invoke_passes_payload_through_untouched() {
        let (bridge, received) = recording_bridge();
        let payload = serde_json::json!({"layout": {"walls": [1, 2, 3]}, "version": 7});
        let message = Message::assistant("reply").with_actions(vec![MessageAction {
            label: "Apply layout".into(),
            payload: payload.clone(),
        }]);

        let handles = bridge.handles_for(&message);
        bridge.invoke(&handles[0]);

        let received = received.lock().unwrap();
        assert_eq!(received.as_slice(), &[payload]);
    }

    #[test]
    fn message_without_actions_yields_no_handles() {
        let (bridge, _) = recording_bridge();
        let message = Message::assistant("plain reply");
        assert!(bridge.handles_for(&message).is_empty());
    }
}
