use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::{GenerationRequest, RequestPatch};
use crate::domain::errors::DomainError;
use crate::domain::repositories::{RequestRepository, StatusChange};
use crate::domain::value_objects::RequestStatus;

/// Minutes added to the ETA for every request already waiting.
const MINUTES_PER_QUEUED_REQUEST: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub user_query: String,
    pub model: Option<String>,
    pub name: String,
    pub userid: String,
}

#[derive(Debug, Clone)]
pub struct CreateResponse {
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub estimated_completion_time_minutes: f64,
    pub message: String,
}

/// User-facing operations on generation requests.
///
/// Every mutation is a conditional write against the store, so these calls
/// are safe to race with the background worker.
pub struct RequestLifecycleService {
    repository: Arc<dyn RequestRepository>,
    default_model: String,
    base_processing_minutes: f64,
}

impl RequestLifecycleService {
    pub fn new(
        repository: Arc<dyn RequestRepository>,
        default_model: impl Into<String>,
        base_processing_minutes: f64,
    ) -> Self {
        Self {
            repository,
            default_model: default_model.into(),
            base_processing_minutes,
        }
    }

    pub async fn create(&self, request: CreateRequest) -> Result<CreateResponse, DomainError> {
        let record = GenerationRequest::new(
            request.user_query,
            request.model,
            request.name,
            request.userid,
            &self.default_model,
        )?;

        self.repository.insert(&record).await?;

        let queued = self.repository.count_by_status(RequestStatus::Queued).await?;
        let estimated = (queued + 1) as f64 * MINUTES_PER_QUEUED_REQUEST + self.base_processing_minutes;

        info!(request_id = %record.id(), userid = record.userid(), "Queued generation request");

        Ok(CreateResponse {
            request_id: record.id(),
            status: record.status(),
            estimated_completion_time_minutes: estimated,
            message: "Your article generation request has been queued. Keep the request_id to check its status later."
                .to_string(),
        })
    }

    pub async fn list_by_user(&self, userid: &str) -> Result<Vec<GenerationRequest>, DomainError> {
        if userid.trim().is_empty() {
            return Err(DomainError::validation("userid is required"));
        }
        Ok(self.repository.find_by_user(userid).await?)
    }

    pub async fn get_status(&self, id: Uuid) -> Result<GenerationRequest, DomainError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound(id))
    }

    pub async fn update(&self, id: Uuid, patch: RequestPatch) -> Result<GenerationRequest, DomainError> {
        patch.validate()?;
        let current = self.require_status(id, RequestStatus::Queued).await?;

        if patch.is_empty() {
            return Ok(current);
        }

        if !self.repository.update_if_queued(id, &patch).await? {
            return Err(self.explain_lost_race(id, RequestStatus::Queued).await);
        }

        info!(request_id = %id, "Updated queued request");
        self.get_status(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        self.require_status(id, RequestStatus::Queued).await?;

        if !self.repository.delete_if_queued(id).await? {
            return Err(self.explain_lost_race(id, RequestStatus::Queued).await);
        }

        info!(request_id = %id, "Deleted queued request");
        Ok(())
    }

    pub async fn requeue(&self, id: Uuid) -> Result<GenerationRequest, DomainError> {
        self.require_status(id, RequestStatus::Failed).await?;

        if !self.repository.transition(id, &StatusChange::Requeue).await? {
            return Err(self.explain_lost_race(id, RequestStatus::Failed).await);
        }

        info!(request_id = %id, "Requeued failed request");
        self.get_status(id).await
    }

    async fn require_status(
        &self,
        id: Uuid,
        required: RequestStatus,
    ) -> Result<GenerationRequest, DomainError> {
        let current = self.get_status(id).await?;
        if current.status() != required {
            return Err(DomainError::StateConflict {
                id,
                actual: current.status(),
                required,
            });
        }
        Ok(current)
    }

    /// The status check passed but the conditional write didn't: report what
    /// the record looks like now.
    async fn explain_lost_race(&self, id: Uuid, required: RequestStatus) -> DomainError {
        match self.repository.find_by_id(id).await {
            Ok(Some(current)) => DomainError::StateConflict {
                id,
                actual: current.status(),
                required,
            },
            Ok(None) => DomainError::NotFound(id),
            Err(e) => e.into(),
        }
    }
}
