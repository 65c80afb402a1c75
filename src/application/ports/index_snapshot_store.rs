use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::VectorIndex;
use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<SnapshotError> for DomainError {
    fn from(error: SnapshotError) -> Self {
        DomainError::Storage(error.to_string())
    }
}

/// Durable copy of the active index, so restarts don't re-embed the corpus.
#[async_trait]
pub trait IndexSnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<VectorIndex>, SnapshotError>;

    async fn save(&self, index: &VectorIndex) -> Result<(), SnapshotError>;
}
