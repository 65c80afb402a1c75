use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::RequestStatus;

/// Errors surfaced by the request lifecycle, the retriever and the index admin.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request not found: {0}")]
    NotFound(Uuid),

    #[error("Request {id} is {actual}; operation requires {required}")]
    StateConflict {
        id: Uuid,
        actual: RequestStatus,
        required: RequestStatus,
    },

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    /// Stable machine-readable code used in API error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "VALIDATION_ERROR",
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::StateConflict { .. } => "STATE_CONFLICT",
            DomainError::Permission(_) => "PERMISSION_DENIED",
            DomainError::Generation(_) => "GENERATION_FAILED",
            DomainError::Retrieval(_) => "RETRIEVAL_FAILED",
            DomainError::Storage(_) => "STORAGE_ERROR",
        }
    }
}
