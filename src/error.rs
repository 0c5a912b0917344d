//! Leaf error types for the store and LLM boundaries.
//!
//! Everything above these two boundaries (fetch, summarize, entity, cluster,
//! synthesize, score, scheduler) propagates with `anyhow::Result`, matching
//! the teacher's near-universal use of `anyhow` outside `sqlx` call sites.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    AlreadyExists,

    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

impl StoreError {
    /// Classifies a raw `sqlx::Error` the way the teacher's `DbLockErrorExt`
    /// classifies lock errors: unique-constraint violations become a typed
    /// `AlreadyExists`, everything else is a transient `Unavailable`.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return StoreError::AlreadyExists;
            }
        }
        StoreError::Unavailable(err)
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM endpoint unavailable")]
    Unavailable,

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM response could not be parsed as JSON by any strategy")]
    BadResponse,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("content extraction failed: {0}")]
    Failed(String),
}
