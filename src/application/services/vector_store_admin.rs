use chrono::{DateTime, Utc};
use html2text::from_read;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::application::ports::{EmbeddingProvider, IndexSnapshotStore};
use crate::application::services::ActiveIndex;
use crate::domain::entities::{CorpusDocument, RagDocument, VectorIndex};
use crate::domain::errors::DomainError;
use crate::domain::repositories::CorpusRepository;

const HTML_RENDER_WIDTH: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct RebuildSummary {
    pub document_count: usize,
    pub skipped: usize,
    pub built_at: DateTime<Utc>,
}

/// Owns rebuilds of the active index.
///
/// A rebuild embeds the whole corpus into a fresh index and only swaps it in
/// once it is complete. Concurrent rebuilds are serialised.
pub struct VectorStoreAdmin {
    corpus: Arc<dyn CorpusRepository>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    snapshot_store: Arc<dyn IndexSnapshotStore>,
    index: Arc<ActiveIndex>,
    admin_password: String,
    url_template: String,
    rebuild_lock: Mutex<()>,
}

impl VectorStoreAdmin {
    pub fn new(
        corpus: Arc<dyn CorpusRepository>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        snapshot_store: Arc<dyn IndexSnapshotStore>,
        index: Arc<ActiveIndex>,
        admin_password: impl Into<String>,
        url_template: impl Into<String>,
    ) -> Self {
        Self {
            corpus,
            embedding_provider,
            snapshot_store,
            index,
            admin_password: admin_password.into(),
            url_template: url_template.into(),
            rebuild_lock: Mutex::new(()),
        }
    }

    pub async fn reset(&self, password: &str) -> Result<RebuildSummary, DomainError> {
        if !secrets_match(password, &self.admin_password) {
            warn!("Rejected vector store reset: bad admin password");
            return Err(DomainError::Permission("invalid admin password".to_string()));
        }
        self.rebuild().await
    }

    pub async fn rebuild(&self) -> Result<RebuildSummary, DomainError> {
        let _guard = self.rebuild_lock.lock().await;
        info!("Rebuilding vector index from corpus");

        let corpus = self.corpus.load_all().await?;
        let total = corpus.len();
        let fresh = self.build_index(corpus).await?;
        let summary = RebuildSummary {
            document_count: fresh.len(),
            skipped: total - fresh.len(),
            built_at: fresh.built_at(),
        };

        if let Err(e) = self.snapshot_store.save(&fresh).await {
            warn!(error = %e, "Failed to persist index snapshot; serving the new index anyway");
        }
        let previous = self.index.replace(fresh);

        info!(
            documents = summary.document_count,
            skipped = summary.skipped,
            previous_documents = previous.len(),
            "Vector index swapped in"
        );
        Ok(summary)
    }

    /// Installs the persisted index, if any. Returns whether one was found.
    pub async fn restore_from_snapshot(&self) -> Result<bool, DomainError> {
        match self.snapshot_store.load().await? {
            Some(index) => {
                info!(documents = index.len(), built_at = %index.built_at(), "Restored vector index snapshot");
                self.index.replace(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn build_index(&self, corpus: Vec<CorpusDocument>) -> Result<VectorIndex, DomainError> {
        let prepared: Vec<(CorpusDocument, String)> = corpus
            .into_iter()
            .filter_map(|document| match to_plain_text(&document.content) {
                Some(text) => Some((document, text)),
                None => {
                    debug!(id = %document.id, "Skipping corpus document with no text");
                    None
                }
            })
            .collect();

        let batch_size = self.embedding_provider.max_batch_size().max(1);
        let mut documents = Vec::with_capacity(prepared.len());

        for batch in prepared.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
            let embeddings = self.embedding_provider.generate_embeddings(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(DomainError::Retrieval(format!(
                    "embedding service returned {} vectors for {} texts",
                    embeddings.len(),
                    batch.len()
                )));
            }

            for ((document, text), embedding) in batch.iter().zip(embeddings) {
                let mut metadata = BTreeMap::new();
                metadata.insert("title".to_string(), document.title.clone());
                metadata.insert("url".to_string(), self.url_template.replace("{id}", &document.id));
                documents.push(RagDocument::new(document.id.clone(), embedding, text.clone(), metadata));
            }
        }

        VectorIndex::build(documents)
    }
}

/// HTML to a single line of printable ASCII. `None` when nothing is left.
fn to_plain_text(html: &str) -> Option<String> {
    let rendered = from_read(html.as_bytes(), HTML_RENDER_WIDTH).unwrap_or_else(|e| {
        debug!(error = %e, "HTML conversion failed; indexing raw content");
        html.to_string()
    });

    let text = rendered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect::<String>();
    let text = text.trim();

    (!text.is_empty()).then(|| text.to_string())
}

/// Compares digests so the running time doesn't depend on where the inputs differ.
fn secrets_match(given: &str, expected: &str) -> bool {
    let given = Sha256::digest(given.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    given
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{KeywordEmbedding, MemorySnapshotStore, StaticCorpus, corpus_doc};
    use std::sync::atomic::Ordering;

    struct Fixture {
        admin: VectorStoreAdmin,
        corpus: Arc<StaticCorpus>,
        embedding: Arc<KeywordEmbedding>,
        snapshots: Arc<MemorySnapshotStore>,
        index: Arc<ActiveIndex>,
    }

    fn fixture(documents: Vec<CorpusDocument>) -> Fixture {
        let corpus = Arc::new(StaticCorpus::new(documents));
        let embedding = Arc::new(KeywordEmbedding::new(&[], vec![1.0, 0.0]));
        let snapshots = Arc::new(MemorySnapshotStore::default());
        let index = Arc::new(ActiveIndex::default());
        let admin = VectorStoreAdmin::new(
            corpus.clone(),
            embedding.clone(),
            snapshots.clone(),
            index.clone(),
            "s3cret",
            "https://blog.example/posts/{id}",
        );
        Fixture {
            admin,
            corpus,
            embedding,
            snapshots,
            index,
        }
    }

    fn three_posts() -> Vec<CorpusDocument> {
        vec![
            corpus_doc("1", "Tides", "<p>The moon pulls the sea.</p>"),
            corpus_doc("2", "Orbits", "<h2>Kepler</h2><p>Ellipses   everywhere.</p>"),
            corpus_doc("3", "Seasons", "<p>Axial tilt.</p>"),
        ]
    }

    #[tokio::test]
    async fn test_reset_builds_and_swaps_index() {
        let f = fixture(three_posts());
        let summary = f.admin.reset("s3cret").await.unwrap();

        assert_eq!(summary.document_count, 3);
        assert_eq!(f.index.document_count(), 3);

        let current = f.index.current();
        let first = &current.documents()[0];
        assert_eq!(first.metadata_value("title"), Some("Tides"));
        assert_eq!(first.metadata_value("url"), Some("https://blog.example/posts/1"));
        assert!(!first.source_text().contains('<'));

        // Batches of two: three documents take two calls.
        assert_eq!(f.embedding.calls.load(Ordering::SeqCst), 2);
        assert!(f.snapshots.saved.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_wrong_password_leaves_index_untouched() {
        let f = fixture(three_posts());
        f.admin.reset("s3cret").await.unwrap();
        f.corpus.documents.lock().unwrap().truncate(1);

        let err = f.admin.reset("guess").await.unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
        assert_eq!(f.index.document_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_index() {
        let f = fixture(three_posts());
        f.admin.reset("s3cret").await.unwrap();
        let before = f.index.current();

        f.embedding.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            f.admin.reset("s3cret").await,
            Err(DomainError::Retrieval(_))
        ));
        assert!(Arc::ptr_eq(&before, &f.index.current()));

        f.embedding.fail.store(false, Ordering::SeqCst);
        f.corpus.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            f.admin.reset("s3cret").await,
            Err(DomainError::Storage(_))
        ));
        assert!(Arc::ptr_eq(&before, &f.index.current()));
    }

    #[tokio::test]
    async fn test_snapshot_failure_still_swaps() {
        let f = fixture(three_posts());
        f.snapshots.fail_save.store(true, Ordering::SeqCst);
        let summary = f.admin.rebuild().await.unwrap();
        assert_eq!(summary.document_count, 3);
        assert_eq!(f.index.document_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_documents_are_skipped() {
        let mut posts = three_posts();
        posts.push(corpus_doc("4", "Blank", "<div>   </div>"));
        let f = fixture(posts);

        let summary = f.admin.rebuild().await.unwrap();
        assert_eq!(summary.document_count, 3);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_restore_from_snapshot() {
        let f = fixture(three_posts());
        assert!(!f.admin.restore_from_snapshot().await.unwrap());

        f.admin.rebuild().await.unwrap();
        let other = fixture(vec![]);
        *other.snapshots.saved.lock().unwrap() = f.snapshots.saved.lock().unwrap().clone();

        assert!(other.admin.restore_from_snapshot().await.unwrap());
        assert_eq!(other.index.document_count(), 3);
    }

    #[test]
    fn test_plain_text_normalisation() {
        assert_eq!(
            to_plain_text("<p>caf\u{e9}   au\n\nlait</p>").as_deref(),
            Some("caf au lait")
        );
        assert_eq!(to_plain_text("<p> </p>"), None);
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cre", "s3cret"));
        assert!(!secrets_match("", "s3cret"));
    }
}
