use async_trait::async_trait;
use diesel::prelude::*;

use crate::domain::entities::CorpusDocument;
use crate::domain::repositories::corpus_repository::{CorpusRepository, CorpusRepositoryError};
use crate::infrastructure::database::DbPool;
use crate::infrastructure::database::models::CorpusPostModel;
use crate::infrastructure::database::schema::corpus_posts;

pub struct PostgresCorpusRepository {
    pool: DbPool,
}

impl PostgresCorpusRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CorpusRepository for PostgresCorpusRepository {
    async fn load_all(&self) -> Result<Vec<CorpusDocument>, CorpusRepositoryError> {
        let mut conn = self.pool.get().map_err(|e| {
            CorpusRepositoryError::DatabaseError(format!("Failed to get database connection: {}", e))
        })?;

        let posts = tokio::task::spawn_blocking(move || {
            corpus_posts::table
                .order(corpus_posts::id.asc())
                .select(CorpusPostModel::as_select())
                .load::<CorpusPostModel>(&mut conn)
                .map_err(|e| CorpusRepositoryError::DatabaseError(format!("Failed to load corpus: {}", e)))
        })
        .await
        .map_err(|e| CorpusRepositoryError::DatabaseError(format!("Task join error: {}", e)))??;

        Ok(posts.into_iter().map(CorpusDocument::from).collect())
    }
}
