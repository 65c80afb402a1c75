use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::entities::{GenerationRequest, RequestPatch};
use crate::domain::repositories::RequestRepository;
use crate::domain::repositories::request_repository::{RequestRepositoryError, StatusChange};
use crate::domain::value_objects::RequestStatus;
use crate::infrastructure::database::models::{
    NewRequestModel, RequestModel, RequestPatchModel, StatusChangeModel,
};
use crate::infrastructure::database::schema::generation_requests;
use crate::infrastructure::database::{DbConnection, DbPool};

/// Request store backed by the `generation_requests` table.
///
/// Conditional writes are single `UPDATE`/`DELETE` statements filtered on the
/// expected status; the affected row count tells whether they applied.
pub struct PostgresRequestRepository {
    pool: DbPool,
}

impl PostgresRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<DbConnection, RequestRepositoryError> {
        self.pool.get().map_err(|e| {
            RequestRepositoryError::DatabaseError(format!("Failed to get database connection: {}", e))
        })
    }

    async fn run<T, F>(&self, operation: F) -> Result<T, RequestRepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut DbConnection) -> Result<T, RequestRepositoryError> + Send + 'static,
    {
        let mut conn = self.get_connection()?;
        tokio::task::spawn_blocking(move || operation(&mut conn))
            .await
            .map_err(|e| RequestRepositoryError::DatabaseError(format!("Task join error: {}", e)))?
    }
}

fn db_error(context: &'static str) -> impl FnOnce(diesel::result::Error) -> RequestRepositoryError {
    move |e| RequestRepositoryError::DatabaseError(format!("{}: {}", context, e))
}

fn to_domain(models: Vec<RequestModel>) -> Result<Vec<GenerationRequest>, RequestRepositoryError> {
    models.into_iter().map(GenerationRequest::try_from).collect()
}

fn changeset(change: &StatusChange) -> StatusChangeModel {
    let status = change.target().as_str().to_string();
    match change {
        StatusChange::Claim { at } => StatusChangeModel {
            status,
            claimed_at: Some(Some(*at)),
            completed_at: None,
            result: None,
            error: None,
        },
        StatusChange::Complete { result, at, .. } => StatusChangeModel {
            status,
            claimed_at: None,
            completed_at: Some(Some(*at)),
            result: Some(Some(result.clone())),
            error: Some(None),
        },
        StatusChange::Fail { error, at, .. } => StatusChangeModel {
            status,
            claimed_at: None,
            completed_at: Some(Some(*at)),
            result: Some(None),
            error: Some(Some(error.clone())),
        },
        StatusChange::Requeue => StatusChangeModel {
            status,
            claimed_at: Some(None),
            completed_at: Some(None),
            result: None,
            error: Some(None),
        },
    }
}

#[async_trait]
impl RequestRepository for PostgresRequestRepository {
    async fn insert(&self, request: &GenerationRequest) -> Result<(), RequestRepositoryError> {
        let new_request = NewRequestModel::from(request);

        self.run(move |conn| {
            diesel::insert_into(generation_requests::table)
                .values(&new_request)
                .execute(conn)
                .map_err(db_error("Failed to save request"))
        })
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GenerationRequest>, RequestRepositoryError> {
        let model = self
            .run(move |conn| {
                generation_requests::table
                    .filter(generation_requests::id.eq(id))
                    .select(RequestModel::as_select())
                    .first::<RequestModel>(conn)
                    .optional()
                    .map_err(db_error("Failed to find request"))
            })
            .await?;

        model.map(GenerationRequest::try_from).transpose()
    }

    async fn find_by_user(&self, userid: &str) -> Result<Vec<GenerationRequest>, RequestRepositoryError> {
        let userid = userid.to_string();
        let models = self
            .run(move |conn| {
                generation_requests::table
                    .filter(generation_requests::userid.eq(userid))
                    .order((generation_requests::created_at.desc(), generation_requests::id.asc()))
                    .select(RequestModel::as_select())
                    .load::<RequestModel>(conn)
                    .map_err(db_error("Failed to find requests by user"))
            })
            .await?;

        to_domain(models)
    }

    async fn find_by_status(
        &self,
        status: RequestStatus,
        limit: i64,
    ) -> Result<Vec<GenerationRequest>, RequestRepositoryError> {
        let models = self
            .run(move |conn| {
                generation_requests::table
                    .filter(generation_requests::status.eq(status.as_str()))
                    .order((generation_requests::created_at.asc(), generation_requests::id.asc()))
                    .limit(limit)
                    .select(RequestModel::as_select())
                    .load::<RequestModel>(conn)
                    .map_err(db_error("Failed to find requests by status"))
            })
            .await?;

        to_domain(models)
    }

    async fn count_by_status(&self, status: RequestStatus) -> Result<i64, RequestRepositoryError> {
        self.run(move |conn| {
            generation_requests::table
                .filter(generation_requests::status.eq(status.as_str()))
                .count()
                .get_result::<i64>(conn)
                .map_err(db_error("Failed to count requests"))
        })
        .await
    }

    async fn find_stale_processing(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> Result<Vec<GenerationRequest>, RequestRepositoryError> {
        let models = self
            .run(move |conn| {
                generation_requests::table
                    .filter(generation_requests::status.eq(RequestStatus::Processing.as_str()))
                    .filter(generation_requests::claimed_at.lt(claimed_before))
                    .select(RequestModel::as_select())
                    .load::<RequestModel>(conn)
                    .map_err(db_error("Failed to find stale requests"))
            })
            .await?;

        to_domain(models)
    }

    async fn update_if_queued(&self, id: Uuid, patch: &RequestPatch) -> Result<bool, RequestRepositoryError> {
        let changes = RequestPatchModel::from(patch);

        let updated = self
            .run(move |conn| {
                diesel::update(
                    generation_requests::table
                        .filter(generation_requests::id.eq(id))
                        .filter(generation_requests::status.eq(RequestStatus::Queued.as_str())),
                )
                .set(&changes)
                .execute(conn)
                .map_err(db_error("Failed to update request"))
            })
            .await?;

        Ok(updated == 1)
    }

    async fn delete_if_queued(&self, id: Uuid) -> Result<bool, RequestRepositoryError> {
        let deleted = self
            .run(move |conn| {
                diesel::delete(
                    generation_requests::table
                        .filter(generation_requests::id.eq(id))
                        .filter(generation_requests::status.eq(RequestStatus::Queued.as_str())),
                )
                .execute(conn)
                .map_err(db_error("Failed to delete request"))
            })
            .await?;

        Ok(deleted == 1)
    }

    async fn transition(&self, id: Uuid, change: &StatusChange) -> Result<bool, RequestRepositoryError> {
        let expected = change.expected().as_str();
        let guard = change.claim_guard();
        let changes = changeset(change);

        let updated = self
            .run(move |conn| {
                let target = generation_requests::table
                    .filter(generation_requests::id.eq(id))
                    .filter(generation_requests::status.eq(expected));

                let result = match guard {
                    Some(claimed_at) => diesel::update(
                        target.filter(generation_requests::claimed_at.eq(claimed_at)),
                    )
                    .set(&changes)
                    .execute(conn),
                    None => diesel::update(target).set(&changes).execute(conn),
                };
                result.map_err(db_error("Failed to transition request"))
            })
            .await?;

        Ok(updated == 1)
    }
}
