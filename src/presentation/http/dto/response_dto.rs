use axum::{Json, http::StatusCode};
use serde::Serialize;

use crate::domain::errors::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(code: String, message: String, details: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message,
                details,
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

pub fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::StateConflict { .. } => StatusCode::CONFLICT,
        DomainError::Permission(_) => StatusCode::FORBIDDEN,
        DomainError::Generation(_) | DomainError::Retrieval(_) => StatusCode::BAD_GATEWAY,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error envelope for a failed operation.
pub fn error_response<T>(error: &DomainError) -> (StatusCode, Json<ApiResponse<T>>) {
    let details = match error {
        DomainError::StateConflict { actual, .. } => Some(format!("current status: {}", actual)),
        _ => None,
    };

    (
        status_for(error),
        Json(ApiResponse::error(
            error.code().to_string(),
            error.to_string(),
            details,
        )),
    )
}

#[derive(Debug, Serialize)]
pub struct HealthResponseDto {
    pub status: String,
    pub version: String,
    pub index_documents: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponseDto {
    pub message: String,
}
