use async_trait::async_trait;
use pgvector::Vector;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum EmbeddingProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl From<EmbeddingProviderError> for DomainError {
    fn from(error: EmbeddingProviderError) -> Self {
        DomainError::Retrieval(error.to_string())
    }
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn generate_embedding(&self, text: &str) -> Result<Vector, EmbeddingProviderError>;

    /// One embedding per input, in input order.
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingProviderError>;

    /// Largest batch `generate_embeddings` accepts in one call.
    fn max_batch_size(&self) -> usize {
        64
    }
}
