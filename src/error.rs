//! Error Taxonomy
//!
//! Every fallible operation in the library surfaces a [`DirectoryError`],
//! so callers can distinguish a rejected request (validation failure,
//! conflict, unknown message type) from a transient infrastructure failure
//! (store unavailable, deadline elapsed). Only the latter class is worth
//! retrying.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A required field was empty or malformed.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// The requested key does not exist in the persistent store.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request violates an exclusivity rule (e.g. a dataset that is
    /// already checked out under single-checkout policy).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Signature verification of an inbound message failed. The payload
    /// of such a message is never applied.
    #[error("message authentication failed: {0}")]
    Authentication(String),

    /// The message envelope carried a type this handler does not dispatch.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// The persistent store or the messaging transport could not be
    /// reached. Callers may retry.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A blocking exchange was cancelled by its deadline.
    #[error("deadline elapsed: {0}")]
    Timeout(String),
}

impl DirectoryError {
    /// True for failures a caller may reasonably retry; false for
    /// rejections that will fail again unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DirectoryError::Unavailable(_) | DirectoryError::Timeout(_)
        )
    }
}

impl From<rusqlite::Error> for DirectoryError {
    fn from(err: rusqlite::Error) -> Self {
        DirectoryError::Unavailable(format!("sqlite: {err}"))
    }
}

impl From<bincode::Error> for DirectoryError {
    fn from(err: bincode::Error) -> Self {
        DirectoryError::Validation(format!("envelope codec: {err}"))
    }
}
