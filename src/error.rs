//! Failure taxonomy shared by providers and per-item processing.
//!
//! The pipeline recovers from most item-level failures by counting them
//! and moving on; the variants here let callers tell the recoverable
//! classes apart (e.g. a duplicate-attachment conflict is a skip, a
//! provider failure is an error).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Failure {
    /// A referenced record no longer exists (dangling id).
    #[error("not found: {0}")]
    NotFound(String),

    /// An embedding, captioning, or chat call failed.
    #[error("provider failure: {0}")]
    Provider(String),

    /// An insert collided with an existing row (duplicate edge or
    /// duplicate attachment name). Idempotent no-op for callers.
    #[error("persistence conflict: {0}")]
    Conflict(String),
}
