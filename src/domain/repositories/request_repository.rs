use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{GenerationRequest, RequestPatch};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::RequestStatus;

#[derive(Debug, Error)]
pub enum RequestRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: Uuid, reason: String },
}

impl From<RequestRepositoryError> for DomainError {
    fn from(error: RequestRepositoryError) -> Self {
        DomainError::Storage(error.to_string())
    }
}

/// A compare-and-set status write.
///
/// The store applies it only if the persisted status equals
/// [`StatusChange::expected`] (and, for outcome writes, the claim timestamp
/// still matches), in a single atomic step.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    Claim { at: DateTime<Utc> },
    Complete { claimed_at: Option<DateTime<Utc>>, result: String, at: DateTime<Utc> },
    Fail { claimed_at: Option<DateTime<Utc>>, error: String, at: DateTime<Utc> },
    Requeue,
}

impl StatusChange {
    /// Claim stamped with a timestamp that survives a round trip through
    /// microsecond-precision storage.
    pub fn claim_now() -> Self {
        StatusChange::Claim {
            at: Utc::now().trunc_subsecs(6),
        }
    }

    pub fn expected(&self) -> RequestStatus {
        match self {
            StatusChange::Claim { .. } => RequestStatus::Queued,
            StatusChange::Complete { .. } | StatusChange::Fail { .. } => RequestStatus::Processing,
            StatusChange::Requeue => RequestStatus::Failed,
        }
    }

    pub fn target(&self) -> RequestStatus {
        match self {
            StatusChange::Claim { .. } => RequestStatus::Processing,
            StatusChange::Complete { .. } => RequestStatus::Completed,
            StatusChange::Fail { .. } => RequestStatus::Failed,
            StatusChange::Requeue => RequestStatus::Queued,
        }
    }

    /// Claim the outcome write is bound to, if any.
    pub fn claim_guard(&self) -> Option<DateTime<Utc>> {
        match self {
            StatusChange::Complete { claimed_at, .. } | StatusChange::Fail { claimed_at, .. } => {
                *claimed_at
            }
            _ => None,
        }
    }

    /// Applies the change to an in-memory record, enforcing the same guards a
    /// store must enforce. Returns `false` when the guard does not hold.
    pub fn apply_to(&self, request: &mut GenerationRequest) -> bool {
        if request.status() != self.expected() {
            return false;
        }
        if let Some(guard) = self.claim_guard() {
            if request.claimed_at() != Some(guard) {
                return false;
            }
        }

        let outcome = match self {
            StatusChange::Claim { at } => request.claim(*at),
            StatusChange::Complete { result, at, .. } => request.complete(result.clone(), *at),
            StatusChange::Fail { error, at, .. } => request.fail(error.clone(), *at),
            StatusChange::Requeue => request.requeue(),
        };
        outcome.is_ok()
    }
}

/// Persistent store for generation requests.
///
/// Every method that returns `bool` is a conditional write: `true` means the
/// write was applied, `false` means the record was missing or no longer in the
/// required state. No in-process locking is assumed by callers.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn insert(&self, request: &GenerationRequest) -> Result<(), RequestRepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GenerationRequest>, RequestRepositoryError>;

    /// Newest first.
    async fn find_by_user(&self, userid: &str) -> Result<Vec<GenerationRequest>, RequestRepositoryError>;

    /// Oldest first, at most `limit` records.
    async fn find_by_status(
        &self,
        status: RequestStatus,
        limit: i64,
    ) -> Result<Vec<GenerationRequest>, RequestRepositoryError>;

    async fn count_by_status(&self, status: RequestStatus) -> Result<i64, RequestRepositoryError>;

    /// Requests in PROCESSING whose claim is older than `claimed_before`.
    async fn find_stale_processing(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> Result<Vec<GenerationRequest>, RequestRepositoryError>;

    async fn update_if_queued(&self, id: Uuid, patch: &RequestPatch) -> Result<bool, RequestRepositoryError>;

    async fn delete_if_queued(&self, id: Uuid) -> Result<bool, RequestRepositoryError>;

    async fn transition(&self, id: Uuid, change: &StatusChange) -> Result<bool, RequestRepositoryError>;
}
