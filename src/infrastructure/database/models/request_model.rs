use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::entities::{GenerationRequest, RequestPatch};
use crate::domain::repositories::request_repository::RequestRepositoryError;
use crate::domain::value_objects::RequestStatus;
use crate::infrastructure::database::schema::generation_requests;

#[derive(Debug, Queryable, Identifiable, Selectable)]
#[diesel(table_name = generation_requests)]
#[diesel(primary_key(id))]
pub struct RequestModel {
    pub id: Uuid,
    pub user_query: String,
    pub model: String,
    pub name: String,
    pub userid: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = generation_requests)]
pub struct NewRequestModel {
    pub id: Uuid,
    pub user_query: String,
    pub model: String,
    pub name: String,
    pub userid: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<String>,
    pub error: Option<String>,
}

/// User-editable columns; `None` leaves the column alone.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = generation_requests)]
pub struct RequestPatchModel {
    pub model: Option<String>,
    pub user_query: Option<String>,
}

/// Columns touched by a status transition. Doubly-optional fields set the
/// column to NULL with `Some(None)`.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = generation_requests)]
pub struct StatusChangeModel {
    pub status: String,
    pub claimed_at: Option<Option<DateTime<Utc>>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub result: Option<Option<String>>,
    pub error: Option<Option<String>>,
}

impl From<&GenerationRequest> for NewRequestModel {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            id: request.id(),
            user_query: request.user_query().to_string(),
            model: request.model().to_string(),
            name: request.name().to_string(),
            userid: request.userid().to_string(),
            status: request.status().as_str().to_string(),
            created_at: request.created_at(),
            claimed_at: request.claimed_at(),
            completed_at: request.completed_at(),
            result: request.result().map(str::to_string),
            error: request.error().map(str::to_string),
        }
    }
}

impl From<&RequestPatch> for RequestPatchModel {
    fn from(patch: &RequestPatch) -> Self {
        Self {
            model: patch.model.clone(),
            user_query: patch.user_query.clone(),
        }
    }
}

impl TryFrom<RequestModel> for GenerationRequest {
    type Error = RequestRepositoryError;

    fn try_from(model: RequestModel) -> Result<Self, Self::Error> {
        let status = RequestStatus::from_string(&model.status).map_err(|reason| {
            RequestRepositoryError::CorruptRecord {
                id: model.id,
                reason,
            }
        })?;

        Ok(GenerationRequest::from_database(
            model.id,
            model.user_query,
            model.model,
            model.name,
            model.userid,
            status,
            model.created_at,
            model.claimed_at,
            model.completed_at,
            model.result,
            model.error,
        ))
    }
}
