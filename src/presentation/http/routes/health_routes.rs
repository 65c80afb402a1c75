use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use std::sync::Arc;

use crate::application::services::ActiveIndex;
use crate::presentation::http::dto::{ApiResponse, HealthResponseDto};

pub fn health_routes(index: Arc<ActiveIndex>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .with_state(index)
}

async fn root_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse::success(format!(
            "{} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))),
    )
}

async fn health_handler(State(index): State<Arc<ActiveIndex>>) -> impl IntoResponse {
    let health_response = HealthResponseDto {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index_documents: index.document_count(),
    };

    (StatusCode::OK, Json(ApiResponse::success(health_response)))
}
