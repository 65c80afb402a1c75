use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::ports::{EmbeddingProvider, GenerationPrompt, GenerationProvider};
use crate::application::services::ActiveIndex;
use crate::domain::entities::ScoredDocument;
use crate::domain::errors::DomainError;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;
pub const DEFAULT_RAG_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's question clearly and concisely. \
When context documents are provided, ground your answer in them and say so when they do not contain the answer.";

const SNIPPET_CHARS: usize = 200;
const EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    RagWithSources,
    GeneralFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub relevance_score: f32,
    pub text_snippet: String,
}

impl From<&ScoredDocument> for SourceRecord {
    fn from(hit: &ScoredDocument) -> Self {
        let document = &hit.document;
        Self {
            id: document.id().to_string(),
            title: document.metadata_value("title").unwrap_or("N/A").to_string(),
            url: document.metadata_value("url").unwrap_or("N/A").to_string(),
            relevance_score: (hit.similarity * 1000.0).round() / 1000.0,
            text_snippet: document.snippet(SNIPPET_CHARS),
        }
    }
}

/// One line of the streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerEvent {
    Partial {
        content: String,
    },
    Complete {
        response_type: ResponseType,
        sources: Vec<SourceRecord>,
        done: bool,
    },
    Error {
        message: String,
        done: bool,
    },
}

impl AnswerEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnswerEvent::Partial { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RagSettings {
    pub model: String,
    pub system_prompt: String,
    pub top_k: usize,
}

/// Threshold-gated retrieval followed by a streamed, context-augmented answer.
pub struct RagService {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generation_provider: Arc<dyn GenerationProvider>,
    index: Arc<ActiveIndex>,
    settings: RagSettings,
}

impl RagService {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        generation_provider: Arc<dyn GenerationProvider>,
        index: Arc<ActiveIndex>,
        settings: RagSettings,
    ) -> Self {
        Self {
            embedding_provider,
            generation_provider,
            index,
            settings,
        }
    }

    /// Validates input, then starts the pipeline in the background.
    ///
    /// The returned stream ends after exactly one terminal event. Dropping it
    /// stops the pipeline and releases the embedding and generation calls.
    pub fn ask(
        self: &Arc<Self>,
        query: String,
        similarity_threshold: Option<f32>,
    ) -> Result<BoxStream<'static, AnswerEvent>, DomainError> {
        if query.trim().is_empty() {
            return Err(DomainError::validation("query cannot be empty"));
        }
        let threshold = similarity_threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(DomainError::validation(
                "similarity_threshold must be between 0 and 1",
            ));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.produce(query, threshold, tx).await;
        });

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed())
    }

    async fn produce(&self, query: String, threshold: f32, tx: mpsc::Sender<AnswerEvent>) {
        let outcome = tokio::select! {
            _ = tx.closed() => {
                debug!("Answer consumer disconnected; abandoning query");
                return;
            }
            outcome = self.answer(&query, threshold, &tx) => outcome,
        };

        if let Err(e) = outcome {
            warn!(error = %e, "RAG query failed");
            let _ = tx
                .send(AnswerEvent::Error {
                    message: e.to_string(),
                    done: true,
                })
                .await;
        }
    }

    async fn answer(
        &self,
        query: &str,
        threshold: f32,
        tx: &mpsc::Sender<AnswerEvent>,
    ) -> Result<(), DomainError> {
        let hits = self.retrieve(query, threshold).await?;

        let response_type = if hits.is_empty() {
            ResponseType::GeneralFallback
        } else {
            ResponseType::RagWithSources
        };
        let prompt = GenerationPrompt {
            model: self.settings.model.clone(),
            system_prompt: Some(self.settings.system_prompt.clone()),
            prompt: build_prompt(query, &hits),
        };

        let mut fragments = self.generation_provider.generate_stream(prompt).await?;
        while let Some(fragment) = fragments.next().await {
            let content = fragment?;
            if content.is_empty() {
                continue;
            }
            if tx.send(AnswerEvent::Partial { content }).await.is_err() {
                return Ok(());
            }
        }

        let _ = tx
            .send(AnswerEvent::Complete {
                response_type,
                sources: hits.iter().map(SourceRecord::from).collect(),
                done: true,
            })
            .await;
        Ok(())
    }

    /// Documents passing `threshold`, best first, capped at `top_k`.
    pub async fn retrieve(&self, query: &str, threshold: f32) -> Result<Vec<ScoredDocument>, DomainError> {
        let embedding = self.embedding_provider.generate_embedding(query).await?;
        let index = self.index.current();
        let top_k = self.settings.top_k;

        let hits = tokio::task::spawn_blocking(move || {
            index.search(embedding.as_slice(), threshold, Some(top_k))
        })
        .await
        .map_err(|e| DomainError::Retrieval(format!("search task failed: {}", e)))??;

        info!(
            sources = hits.len(),
            best = hits.first().map(|h| h.similarity),
            threshold,
            "Retrieved context"
        );
        Ok(hits)
    }
}

fn build_prompt(query: &str, hits: &[ScoredDocument]) -> String {
    if hits.is_empty() {
        return format!("User Query: {}", query);
    }

    let context = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let title = hit.document.metadata_value("title").unwrap_or("Untitled");
            format!("[{}] {}\n{}", i + 1, title, hit.document.source_text())
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Context information is below.\n---------------------\n{}\n---------------------\n\
         Given the context information, answer the query.\nUser Query: {}",
        context, query
    )
}
