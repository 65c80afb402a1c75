use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::CorpusDocument;
use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum CorpusRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<CorpusRepositoryError> for DomainError {
    fn from(error: CorpusRepositoryError) -> Self {
        DomainError::Storage(error.to_string())
    }
}

/// Source of the documents the vector index is built from.
#[async_trait]
pub trait CorpusRepository: Send + Sync {
    async fn load_all(&self) -> Result<Vec<CorpusDocument>, CorpusRepositoryError>;
}
