pub mod errors;
pub mod id;

pub use errors::{BackendError, DecoraError};
pub use id::{new_message_id, MessageId, SessionId};

pub type Result<T> = std::result::Result<T, DecoraError>;
