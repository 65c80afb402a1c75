use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::value_objects::{GeneratedArticle, RequestStatus};

/// A user's queued "write me an article" request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    id: Uuid,
    user_query: String,
    model: String,
    name: String,
    userid: String,
    status: RequestStatus,
    created_at: DateTime<Utc>,
    claimed_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    result: Option<String>,
    error: Option<String>,
}

/// Fields a user may change while the request is still queued.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPatch {
    pub model: Option<String>,
    pub user_query: Option<String>,
}

impl RequestPatch {
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.user_query.is_none()
    }

    /// Rejects fields that are present but blank.
    pub fn validate(&self) -> Result<(), DomainError> {
        if matches!(&self.model, Some(m) if m.trim().is_empty()) {
            return Err(DomainError::validation("model cannot be empty"));
        }
        if matches!(&self.user_query, Some(q) if q.trim().is_empty()) {
            return Err(DomainError::validation("user_query cannot be empty"));
        }
        Ok(())
    }
}

fn required(field: &str, value: String) -> Result<String, DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{} is required", field)));
    }
    Ok(value)
}

impl GenerationRequest {
    pub fn new(
        user_query: String,
        model: Option<String>,
        name: String,
        userid: String,
        default_model: &str,
    ) -> Result<Self, DomainError> {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model.to_string());

        Ok(Self {
            id: Uuid::new_v4(),
            user_query: required("user_query", user_query)?,
            model,
            name: required("name", name)?,
            userid: required("userid", userid)?,
            status: RequestStatus::Queued,
            created_at: Utc::now(),
            claimed_at: None,
            completed_at: None,
            result: None,
            error: None,
        })
    }

    /// Rebuilds a request from persisted values.
    #[allow(clippy::too_many_arguments)]
    pub fn from_database(
        id: Uuid,
        user_query: String,
        model: String,
        name: String,
        userid: String,
        status: RequestStatus,
        created_at: DateTime<Utc>,
        claimed_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
        result: Option<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            id,
            user_query,
            model,
            name,
            userid,
            status,
            created_at,
            claimed_at,
            completed_at,
            result,
            error,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn userid(&self) -> &str {
        &self.userid
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn claimed_at(&self) -> Option<DateTime<Utc>> {
        self.claimed_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn articles(&self) -> Vec<GeneratedArticle> {
        self.result
            .as_deref()
            .map(GeneratedArticle::extract_all)
            .unwrap_or_default()
    }

    fn conflict(&self, required: RequestStatus) -> DomainError {
        DomainError::StateConflict {
            id: self.id,
            actual: self.status,
            required,
        }
    }

    fn transition(&mut self, to: RequestStatus, required: RequestStatus) -> Result<(), DomainError> {
        if self.status != required || !self.status.can_transition_to(to) {
            return Err(self.conflict(required));
        }
        self.status = to;
        Ok(())
    }

    // Business logic methods
    pub fn apply_patch(&mut self, patch: &RequestPatch) -> Result<(), DomainError> {
        if !self.status.is_user_mutable() {
            return Err(self.conflict(RequestStatus::Queued));
        }
        patch.validate()?;

        if let Some(model) = &patch.model {
            self.model = model.clone();
        }
        if let Some(user_query) = &patch.user_query {
            self.user_query = user_query.clone();
        }
        Ok(())
    }

    pub fn ensure_deletable(&self) -> Result<(), DomainError> {
        if !self.status.is_user_mutable() {
            return Err(self.conflict(RequestStatus::Queued));
        }
        Ok(())
    }

    pub fn claim(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(RequestStatus::Processing, RequestStatus::Queued)?;
        self.claimed_at = Some(at);
        Ok(())
    }

    pub fn complete(&mut self, result: String, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(RequestStatus::Completed, RequestStatus::Processing)?;
        self.result = Some(result);
        self.error = None;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn fail(&mut self, error: String, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(RequestStatus::Failed, RequestStatus::Processing)?;
        self.result = None;
        self.error = Some(error);
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn requeue(&mut self) -> Result<(), DomainError> {
        self.transition(RequestStatus::Queued, RequestStatus::Failed)?;
        self.error = None;
        self.claimed_at = None;
        self.completed_at = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued() -> GenerationRequest {
        GenerationRequest::new(
            "Write about tides".to_string(),
            None,
            "Ada".to_string(),
            "user-1".to_string(),
            "default-model",
        )
        .unwrap()
    }

    #[test]
    fn test_new_request_is_queued_and_empty() {
        let request = queued();
        assert_eq!(request.status(), RequestStatus::Queued);
        assert_eq!(request.model(), "default-model");
        assert!(request.result().is_none());
        assert!(request.error().is_none());
    }

    #[test]
    fn test_new_rejects_blank_required_fields() {
        let result = GenerationRequest::new(
            "  ".to_string(),
            None,
            "Ada".to_string(),
            "user-1".to_string(),
            "m",
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let result = GenerationRequest::new(
            "query".to_string(),
            None,
            "Ada".to_string(),
            String::new(),
            "m",
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_blank_model_falls_back_to_default() {
        let request = GenerationRequest::new(
            "q".to_string(),
            Some(" ".to_string()),
            "n".to_string(),
            "u".to_string(),
            "fallback",
        )
        .unwrap();
        assert_eq!(request.model(), "fallback");
    }

    #[test]
    fn test_success_workflow() {
        let mut request = queued();
        request.claim(Utc::now()).unwrap();
        assert_eq!(request.status(), RequestStatus::Processing);
        assert!(request.claimed_at().is_some());

        request
            .complete("<article><h1>T</h1></article>".to_string(), Utc::now())
            .unwrap();
        assert_eq!(request.status(), RequestStatus::Completed);
        assert!(request.error().is_none());
        assert_eq!(request.articles().len(), 1);
    }

    #[test]
    fn test_failure_and_requeue() {
        let mut request = queued();
        request.claim(Utc::now()).unwrap();
        request.fail("boom".to_string(), Utc::now()).unwrap();
        assert_eq!(request.status(), RequestStatus::Failed);
        assert!(request.result().is_none());
        assert_eq!(request.error(), Some("boom"));

        request.requeue().unwrap();
        assert_eq!(request.status(), RequestStatus::Queued);
        assert!(request.error().is_none());
        assert!(request.claimed_at().is_none());
    }

    #[test]
    fn test_illegal_transitions_leave_record_unchanged() {
        let mut request = queued();
        let before = request.clone();

        assert!(request.complete("x".to_string(), Utc::now()).is_err());
        assert!(request.fail("x".to_string(), Utc::now()).is_err());
        assert!(request.requeue().is_err());
        assert_eq!(request, before);

        request.claim(Utc::now()).unwrap();
        request.complete("done".to_string(), Utc::now()).unwrap();
        let completed = request.clone();
        assert!(request.requeue().is_err());
        assert!(request.claim(Utc::now()).is_err());
        assert_eq!(request, completed);
    }

    #[test]
    fn test_patch_only_applies_while_queued() {
        let mut request = queued();
        let patch = RequestPatch {
            model: Some("other".to_string()),
            user_query: None,
        };
        request.apply_patch(&patch).unwrap();
        assert_eq!(request.model(), "other");
        assert_eq!(request.user_query(), "Write about tides");

        request.claim(Utc::now()).unwrap();
        let err = request.apply_patch(&patch).unwrap_err();
        assert!(matches!(err, DomainError::StateConflict { .. }));
        assert!(request.ensure_deletable().is_err());
    }

    #[test]
    fn test_patch_rejects_blank_values() {
        let mut request = queued();
        let patch = RequestPatch {
            model: None,
            user_query: Some(String::new()),
        };
        assert!(matches!(
            request.apply_patch(&patch),
            Err(DomainError::Validation(_))
        ));
    }
}
