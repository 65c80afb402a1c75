use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::{GenerationRequest, RequestPatch};
use crate::domain::repositories::RequestRepository;
use crate::domain::repositories::request_repository::{RequestRepositoryError, StatusChange};
use crate::domain::value_objects::RequestStatus;

/// Process-local request store. Each conditional write runs under one write
/// lock, which gives it the same all-or-nothing semantics as a single-row
/// `UPDATE ... WHERE status = ...`.
#[derive(Debug, Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<Uuid, GenerationRequest>>,
}

impl InMemoryRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn insert(&self, request: &GenerationRequest) -> Result<(), RequestRepositoryError> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id()) {
            return Err(RequestRepositoryError::DatabaseError(format!(
                "duplicate request id {}",
                request.id()
            )));
        }
        requests.insert(request.id(), request.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GenerationRequest>, RequestRepositoryError> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn find_by_user(&self, userid: &str) -> Result<Vec<GenerationRequest>, RequestRepositoryError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<_> = requests
            .values()
            .filter(|r| r.userid() == userid)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(a.id().cmp(&b.id())));
        Ok(matching)
    }

    async fn find_by_status(
        &self,
        status: RequestStatus,
        limit: i64,
    ) -> Result<Vec<GenerationRequest>, RequestRepositoryError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<_> = requests
            .values()
            .filter(|r| r.status() == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then(a.id().cmp(&b.id())));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn count_by_status(&self, status: RequestStatus) -> Result<i64, RequestRepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.values().filter(|r| r.status() == status).count() as i64)
    }

    async fn find_stale_processing(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> Result<Vec<GenerationRequest>, RequestRepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|r| r.status().is_processing())
            .filter(|r| r.claimed_at().is_some_and(|at| at < claimed_before))
            .cloned()
            .collect())
    }

    async fn update_if_queued(&self, id: Uuid, patch: &RequestPatch) -> Result<bool, RequestRepositoryError> {
        let mut requests = self.requests.write().await;
        match requests.get_mut(&id) {
            Some(request) => Ok(request.apply_patch(patch).is_ok()),
            None => Ok(false),
        }
    }

    async fn delete_if_queued(&self, id: Uuid) -> Result<bool, RequestRepositoryError> {
        let mut requests = self.requests.write().await;
        let deletable = requests
            .get(&id)
            .is_some_and(|r| r.ensure_deletable().is_ok());
        if deletable {
            requests.remove(&id);
        }
        Ok(deletable)
    }

    async fn transition(&self, id: Uuid, change: &StatusChange) -> Result<bool, RequestRepositoryError> {
        let mut requests = self.requests.write().await;
        match requests.get_mut(&id) {
            Some(request) => Ok(change.apply_to(request)),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn request(userid: &str) -> GenerationRequest {
        GenerationRequest::new("q".into(), None, "n".into(), userid.into(), "m").unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let repository = Arc::new(InMemoryRequestRepository::new());
        let record = request("u");
        repository.insert(&record).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repository = repository.clone();
            let id = record.id();
            handles.push(tokio::spawn(async move {
                repository.transition(id, &StatusChange::claim_now()).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        let stored = repository.find_by_id(record.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), RequestStatus::Processing);
    }

    #[tokio::test]
    async fn test_conditional_writes_on_missing_record() {
        let repository = InMemoryRequestRepository::new();
        let id = Uuid::new_v4();
        assert!(!repository.delete_if_queued(id).await.unwrap());
        assert!(!repository.update_if_queued(id, &RequestPatch::default()).await.unwrap());
        assert!(!repository.transition(id, &StatusChange::Requeue).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_status_is_oldest_first_and_bounded() {
        let repository = InMemoryRequestRepository::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let record = request("u");
            ids.push(record.id());
            repository.insert(&record).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let batch = repository.find_by_status(RequestStatus::Queued, 2).await.unwrap();
        let batch_ids: Vec<_> = batch.iter().map(|r| r.id()).collect();
        assert_eq!(batch_ids, ids[..2].to_vec());
    }

    #[tokio::test]
    async fn test_stale_processing_uses_claim_time() {
        let repository = InMemoryRequestRepository::new();
        let record = request("u");
        repository.insert(&record).await.unwrap();
        let old_claim = StatusChange::Claim {
            at: Utc::now() - chrono::Duration::minutes(90),
        };
        repository.transition(record.id(), &old_claim).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::minutes(60);
        assert_eq!(repository.find_stale_processing(cutoff).await.unwrap().len(), 1);

        let earlier_cutoff = Utc::now() - chrono::Duration::minutes(120);
        assert!(repository.find_stale_processing(earlier_cutoff).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let repository = InMemoryRequestRepository::new();
        let record = request("u");
        repository.insert(&record).await.unwrap();
        assert!(repository.insert(&record).await.is_err());
    }
}
