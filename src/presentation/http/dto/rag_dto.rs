use serde::{Deserialize, Serialize};

use crate::application::services::RebuildSummary;

#[derive(Debug, Deserialize)]
pub struct AskRequestDto {
    #[serde(default)]
    pub query: String,
    pub similarity_threshold: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestDto {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetResponseDto {
    pub message: String,
    pub document_count: usize,
    pub skipped: usize,
    pub built_at: String,
}

impl From<RebuildSummary> for ResetResponseDto {
    fn from(summary: RebuildSummary) -> Self {
        Self {
            message: "Vector store rebuilt".to_string(),
            document_count: summary.document_count,
            skipped: summary.skipped,
            built_at: summary.built_at.to_rfc3339(),
        }
    }
}
