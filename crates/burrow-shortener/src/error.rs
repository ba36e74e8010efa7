use burrow_core::{StorageError, ValidationError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{op} failed: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: StorageError,
    },
}

impl ShortenerError {
    /// Wraps a backend error with the name of the failing operation.
    pub fn storage(op: &'static str) -> impl FnOnce(StorageError) -> Self {
        move |source| Self::Storage { op, source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("delete pipeline is shut down")]
    Closed,
}
