use async_trait::async_trait;
use pgvector::Vector;
use reqwest::{Client, Error as ReqwestError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::application::ports::embedding_provider::{EmbeddingProvider, EmbeddingProviderError};

#[derive(Serialize)]
pub struct EmbeddingsRequest {
    pub text: TextInput,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Deserialize)]
pub struct EmbeddingsResponse {
    pub success: bool,
    pub embeddings: Vec<Vector>,
    #[serde(default)]
    pub shape: Vec<usize>,
}

/// Timeout and retry settings shared by the HTTP collaborators.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub service_url: Url,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
}

impl ClientConfig {
    pub fn new(service_url: Url) -> Self {
        Self {
            service_url,
            max_retries: 3,
            timeout_secs: 30,
            base_delay_ms: 1000,
            backoff_factor: 1.5,
        }
    }

    pub fn build_client(&self) -> Result<Client, ReqwestError> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(
            (self.backoff_factor.powi(attempt as i32 - 1) * self.base_delay_ms as f64) as u64,
        )
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Max retries exceeded")]
    MaxRetriesExceeded,
}

/// Runs `call` until it succeeds or `max_retries` retries have failed,
/// sleeping with exponential backoff in between.
pub async fn with_retries<T, F, Fut>(config: &ClientConfig, mut call: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempts = 0;
    let mut last_error = None;

    while attempts <= config.max_retries {
        attempts += 1;

        match call().await {
            Ok(response) => return Ok(response),
            Err(e) => {
                warn!(attempt = attempts, error = %e, url = %config.service_url, "Collaborator call failed");
                last_error = Some(e);

                if attempts <= config.max_retries {
                    tokio::time::sleep(config.backoff(attempts)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or(ClientError::MaxRetriesExceeded))
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
    config: ClientConfig,
}

impl InferenceClient {
    pub fn new(config: ClientConfig) -> Result<Self, ReqwestError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    pub async fn get_embeddings(&self, text: TextInput) -> Result<EmbeddingsResponse, ClientError> {
        let request = EmbeddingsRequest { text };
        with_retries(&self.config, || self.execute_request(&request)).await
    }

    async fn execute_request(&self, request: &EmbeddingsRequest) -> Result<EmbeddingsResponse, ClientError> {
        let response = self
            .client
            .post(self.config.service_url.clone())
            .json(request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ClientError::RequestError(e.without_url().to_string()))?;

        response
            .json::<EmbeddingsResponse>()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))
    }
}

impl From<ClientError> for EmbeddingProviderError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::RequestError(msg) => EmbeddingProviderError::NetworkError(msg),
            ClientError::ParseError(msg) => EmbeddingProviderError::ApiError(msg),
            ClientError::MaxRetriesExceeded => EmbeddingProviderError::ServiceUnavailable,
        }
    }
}

// Adapter to implement the EmbeddingProvider trait
pub struct InferenceEmbeddingProvider {
    client: InferenceClient,
}

impl InferenceEmbeddingProvider {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }

    pub fn from_url(service_url: Url) -> Result<Self, ReqwestError> {
        Ok(Self::new(InferenceClient::new(ClientConfig::new(service_url))?))
    }
}

fn checked(response: EmbeddingsResponse, expected: usize) -> Result<Vec<Vector>, EmbeddingProviderError> {
    if !response.success {
        return Err(EmbeddingProviderError::ApiError(
            "embedding service reported failure".to_string(),
        ));
    }
    if response.embeddings.len() != expected {
        return Err(EmbeddingProviderError::ApiError(format!(
            "expected {} embeddings, got {}",
            expected,
            response.embeddings.len()
        )));
    }
    Ok(response.embeddings)
}

#[async_trait]
impl EmbeddingProvider for InferenceEmbeddingProvider {
    async fn generate_embedding(&self, text: &str) -> Result<Vector, EmbeddingProviderError> {
        if text.trim().is_empty() {
            return Err(EmbeddingProviderError::InvalidInput("empty text".to_string()));
        }

        let response = self
            .client
            .get_embeddings(TextInput::Single(text.to_string()))
            .await?;

        checked(response, 1)?
            .pop()
            .ok_or_else(|| EmbeddingProviderError::ApiError("No embeddings returned".to_string()))
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get_embeddings(TextInput::Multiple(texts.to_vec()))
            .await?;

        checked(response, texts.len())
    }

    fn max_batch_size(&self) -> usize {
        32
    }
}
