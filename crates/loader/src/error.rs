//! Loader error types.

use std::sync::Arc;

use thiserror::Error;

/// Errors produced by a loader or its batch function.
///
/// `LoadError` is `Clone`: one batch result fans out to every caller
/// waiting on the same canonical key.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// Input failed validation; no fetch was attempted for this key.
    #[error("{0}")]
    Validation(String),

    /// The key had no matching row. Sibling keys in the same batch are
    /// unaffected.
    #[error("no match for key `{0}`")]
    NotFound(String),

    /// A bulk read or external call failed. Every key in the window that
    /// triggered it sees this error.
    #[error("{message}")]
    Backend {
        message: String,
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The batch function broke the one-result-per-unique-key invariant.
    #[error("batch produced {got} results for {want} keys")]
    ResultCountMismatch { want: usize, got: usize },

    /// The loader went away before the batch completed.
    #[error("load aborted: loader dropped before the batch completed")]
    Aborted,
}

impl LoadError {
    /// Wraps an infrastructure failure with a user-facing message, keeping
    /// the cause for logging.
    pub fn backend(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LoadError::Backend {
            message: message.into(),
            cause: Arc::new(cause),
        }
    }

    /// The preserved cause of a `Backend` error, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync)> {
        match self {
            LoadError::Backend { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// One per-key outcome.
pub type LoadResult<V> = Result<V, LoadError>;
