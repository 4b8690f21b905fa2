//! Context window selection.
//!
//! Bounds the history slice sent with each backend request. Truncation is
//! recency-biased and silent: older turns are dropped, not summarized.

use crate::message::Message;

/// Default number of history messages sent as conversational context.
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

/// The most recent `limit` messages in original order; the whole history
/// when it is shorter than `limit`.
pub fn context_window(history: &[Message], limit: usize) -> &[Message] {
    let start = history.len().saturating_sub(limit);
    &history[start..]
}
