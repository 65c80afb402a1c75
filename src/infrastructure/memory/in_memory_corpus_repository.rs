use async_trait::async_trait;

use crate::domain::entities::CorpusDocument;
use crate::domain::repositories::corpus_repository::{CorpusRepository, CorpusRepositoryError};

/// Fixed corpus, used when no database is configured.
#[derive(Debug, Default)]
pub struct InMemoryCorpusRepository {
    documents: Vec<CorpusDocument>,
}

impl InMemoryCorpusRepository {
    pub fn new(documents: Vec<CorpusDocument>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl CorpusRepository for InMemoryCorpusRepository {
    async fn load_all(&self) -> Result<Vec<CorpusDocument>, CorpusRepositoryError> {
        Ok(self.documents.clone())
    }
}
