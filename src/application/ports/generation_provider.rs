use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum GenerationProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Empty response from model")]
    EmptyResponse,
}

impl From<GenerationProviderError> for DomainError {
    fn from(error: GenerationProviderError) -> Self {
        DomainError::Generation(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPrompt {
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
}

/// Text fragments in generation order.
pub type TextStream = BoxStream<'static, Result<String, GenerationProviderError>>;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: GenerationPrompt) -> Result<String, GenerationProviderError>;

    /// Dropping the returned stream releases the underlying connection.
    async fn generate_stream(&self, prompt: GenerationPrompt) -> Result<TextStream, GenerationProviderError>;
}
