use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::{Client, Error as ReqwestError, Response};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use url::Url;

use crate::application::ports::generation_provider::{
    GenerationPrompt, GenerationProvider, GenerationProviderError, TextStream,
};
use crate::infrastructure::external_services::inference_client::{
    ClientConfig, ClientError, with_retries,
};

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<&'a str>,
    pub prompt: &'a str,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
}

/// One NDJSON line of a streamed generation.
#[derive(Debug, Deserialize)]
pub struct GenerateDelta {
    #[serde(default)]
    pub delta: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<ClientError> for GenerationProviderError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::RequestError(msg) => GenerationProviderError::NetworkError(msg),
            ClientError::ParseError(msg) => GenerationProviderError::ApiError(msg),
            ClientError::MaxRetriesExceeded => {
                GenerationProviderError::NetworkError("max retries exceeded".to_string())
            }
        }
    }
}

/// HTTP client for the text generation service.
///
/// Whole-text calls are retried with backoff. Streaming calls only retry
/// opening the stream; once fragments flow, a broken connection ends the
/// stream with an error.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: Client,
    config: ClientConfig,
}

impl GenerationClient {
    pub fn new(config: ClientConfig) -> Result<Self, ReqwestError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    pub fn from_url(service_url: Url) -> Result<Self, ReqwestError> {
        let mut config = ClientConfig::new(service_url);
        // Covers the whole exchange, streamed bodies included.
        config.timeout_secs = 300;
        Self::new(config)
    }

    async fn send(&self, request: &GenerateRequest<'_>) -> Result<Response, ClientError> {
        self.client
            .post(self.config.service_url.clone())
            .json(request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ClientError::RequestError(e.without_url().to_string()))
    }
}

#[async_trait]
impl GenerationProvider for GenerationClient {
    async fn generate(&self, prompt: GenerationPrompt) -> Result<String, GenerationProviderError> {
        let request = GenerateRequest {
            model: &prompt.model,
            system_prompt: prompt.system_prompt.as_deref(),
            prompt: &prompt.prompt,
            stream: false,
        };

        let response = with_retries(&self.config, || async {
            self.send(&request)
                .await?
                .json::<GenerateResponse>()
                .await
                .map_err(|e| ClientError::ParseError(e.to_string()))
        })
        .await?;

        if response.text.trim().is_empty() {
            return Err(GenerationProviderError::EmptyResponse);
        }
        Ok(response.text)
    }

    async fn generate_stream(&self, prompt: GenerationPrompt) -> Result<TextStream, GenerationProviderError> {
        let request = GenerateRequest {
            model: &prompt.model,
            system_prompt: prompt.system_prompt.as_deref(),
            prompt: &prompt.prompt,
            stream: true,
        };

        let response = with_retries(&self.config, || self.send(&request)).await?;
        Ok(decode_deltas(response.bytes_stream()))
    }
}

#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

fn parse_line(line: &str) -> Option<Result<String, GenerationProviderError>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let parsed = match serde_json::from_str::<GenerateDelta>(line) {
        Ok(GenerateDelta { error: Some(error), .. }) => Err(GenerationProviderError::ApiError(error)),
        Ok(GenerateDelta { delta, .. }) => Ok(delta),
        Err(e) => Err(GenerationProviderError::ApiError(format!(
            "malformed stream line: {}",
            e
        ))),
    };
    Some(parsed)
}

/// Turns an NDJSON byte stream into text fragments. The first error ends it.
fn decode_deltas<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let ready: VecDeque<Result<String, GenerationProviderError>> = VecDeque::new();
    let state = (bytes.boxed(), LineBuffer::default(), ready, false);

    stream::unfold(state, |(mut bytes, mut lines, mut ready, mut finished)| async move {
        loop {
            if let Some(item) = ready.pop_front() {
                let failed = item.is_err();
                if failed {
                    ready.clear();
                }
                return Some((item, (bytes, lines, ready, finished || failed)));
            }
            if finished {
                return None;
            }
            match bytes.next().await {
                Some(Ok(chunk)) => {
                    ready.extend(lines.push(chunk.as_ref()).iter().filter_map(|l| parse_line(l)))
                }
                Some(Err(e)) => {
                    ready.push_back(Err(GenerationProviderError::NetworkError(e.to_string())));
                    finished = true;
                }
                None => {
                    ready.extend(lines.finish().as_deref().and_then(parse_line));
                    finished = true;
                }
            }
        }
    })
    .boxed()
}
