use serde::{Deserialize, Serialize};

/// Lifecycle state of a generation request.
///
/// ```text
/// Queued --claim--> Processing --success--> Completed
///                   Processing --failure--> Failed --requeue--> Queued
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_queued(&self) -> bool {
        matches!(self, RequestStatus::Queued)
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, RequestStatus::Processing)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RequestStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RequestStatus::Failed)
    }

    /// Completed never leaves; Failed only leaves through requeue.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }

    /// Only queued requests may be edited or deleted by their owner.
    pub fn is_user_mutable(&self) -> bool {
        self.is_queued()
    }

    pub fn can_transition_to(&self, new_status: RequestStatus) -> bool {
        matches!(
            (self, new_status),
            (RequestStatus::Queued, RequestStatus::Processing)
                | (RequestStatus::Processing, RequestStatus::Completed)
                | (RequestStatus::Processing, RequestStatus::Failed)
                | (RequestStatus::Failed, RequestStatus::Queued)
        )
    }

    /// Storage representation used by the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Queued => "queued",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    /// Label shown to API clients.
    pub fn label(&self) -> &'static str {
        match self {
            RequestStatus::Queued => "QUEUED",
            RequestStatus::Processing => "PROCESSING",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Failed => "FAILED",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "queued" => Ok(RequestStatus::Queued),
            "processing" => Ok(RequestStatus::Processing),
            "completed" => Ok(RequestStatus::Completed),
            "failed" => Ok(RequestStatus::Failed),
            other => Err(format!("Invalid request status: {}", other)),
        }
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Queued
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
