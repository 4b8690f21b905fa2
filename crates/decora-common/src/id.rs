use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-wide sequence counter; breaks ties between ids minted
/// within the same millisecond.
static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Mint a new message id. Ids are unique and sort in creation order.
pub fn new_message_id() -> MessageId {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
    MessageId(format!("msg-{millis:013}-{seq:06}"))
}

/// Time-derived message identifier (`msg-<millis>-<seq>`).
/// The zero-padded encoding keeps lexicographic order equal to creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
