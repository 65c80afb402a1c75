//! Fakes for the external collaborators, shared by unit tests.

use async_trait::async_trait;
use futures::stream;
use pgvector::Vector;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::embedding_provider::{EmbeddingProvider, EmbeddingProviderError};
use crate::application::ports::generation_provider::{
    GenerationPrompt, GenerationProvider, GenerationProviderError, TextStream,
};
use crate::application::ports::index_snapshot_store::{IndexSnapshotStore, SnapshotError};
use crate::domain::entities::{CorpusDocument, VectorIndex};
use crate::domain::repositories::corpus_repository::{CorpusRepository, CorpusRepositoryError};

/// Echoes prompts back as HTML articles; prompts containing `fail` error out
/// and prompts containing `panic` panic.
#[derive(Default)]
pub struct ScriptedGeneration {
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<GenerationPrompt>>,
    pub delay: Option<Duration>,
    /// Fragments streamed by `generate_stream`.
    pub stream_fragments: Vec<String>,
    /// Error injected after the fragments have been streamed.
    pub fail_stream_after_fragments: bool,
}

impl ScriptedGeneration {
    pub fn streaming(fragments: &[&str]) -> Self {
        Self {
            stream_fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<GenerationPrompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGeneration {
    async fn generate(&self, prompt: GenerationPrompt) -> Result<String, GenerationProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if prompt.prompt.contains("panic") {
            panic!("generation backend crashed");
        }
        if prompt.prompt.contains("fail") {
            return Err(GenerationProviderError::ApiError("model exploded".to_string()));
        }
        if prompt.prompt.contains("blank") {
            return Ok("   ".to_string());
        }
        Ok(format!("<article><h1>{}</h1><p>body</p></article>", prompt.prompt))
    }

    async fn generate_stream(&self, prompt: GenerationPrompt) -> Result<TextStream, GenerationProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt);

        let mut items: Vec<Result<String, GenerationProviderError>> =
            self.stream_fragments.iter().cloned().map(Ok).collect();
        if self.fail_stream_after_fragments {
            items.push(Err(GenerationProviderError::NetworkError("connection reset".to_string())));
        }
        Ok(Box::pin(stream::iter(items)))
    }
}

/// Embeds known texts to fixed vectors; anything else maps to `fallback`.
pub struct KeywordEmbedding {
    pub vectors: HashMap<String, Vec<f32>>,
    pub fallback: Vec<f32>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl KeywordEmbedding {
    pub fn new(pairs: &[(&str, Vec<f32>)], fallback: Vec<f32>) -> Self {
        Self {
            vectors: pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            fallback,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    fn lookup(&self, text: &str) -> Vector {
        Vector::from(
            self.vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()),
        )
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedding {
    async fn generate_embedding(&self, text: &str) -> Result<Vector, EmbeddingProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingProviderError::ServiceUnavailable);
        }
        Ok(self.lookup(text))
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingProviderError::ServiceUnavailable);
        }
        Ok(texts.iter().map(|t| self.lookup(t)).collect())
    }

    fn max_batch_size(&self) -> usize {
        2
    }
}

pub struct StaticCorpus {
    pub documents: Mutex<Vec<CorpusDocument>>,
    pub fail: AtomicBool,
}

impl StaticCorpus {
    pub fn new(documents: Vec<CorpusDocument>) -> Self {
        Self {
            documents: Mutex::new(documents),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl CorpusRepository for StaticCorpus {
    async fn load_all(&self) -> Result<Vec<CorpusDocument>, CorpusRepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CorpusRepositoryError::DatabaseError("corpus offline".to_string()));
        }
        Ok(self.documents.lock().unwrap().clone())
    }
}

pub fn corpus_doc(id: &str, title: &str, content: &str) -> CorpusDocument {
    CorpusDocument {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
    }
}

#[derive(Default)]
pub struct MemorySnapshotStore {
    pub saved: Mutex<Option<VectorIndex>>,
    pub fail_save: AtomicBool,
}

#[async_trait]
impl IndexSnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<VectorIndex>, SnapshotError> {
        Ok(self.saved.lock().unwrap().clone())
    }

    async fn save(&self, index: &VectorIndex) -> Result<(), SnapshotError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(SnapshotError::IoError("disk full".to_string()));
        }
        *self.saved.lock().unwrap() = Some(index.clone());
        Ok(())
    }
}
