use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::application::services::VectorStoreAdmin;
use crate::presentation::http::dto::{
    ApiResponse, ResetRequestDto, ResetResponseDto, error_response,
};

pub struct AdminHandler {
    admin: Arc<VectorStoreAdmin>,
}

impl AdminHandler {
    pub fn new(admin: Arc<VectorStoreAdmin>) -> Self {
        Self { admin }
    }

    pub async fn reset_vector_store(
        State(handler): State<Arc<AdminHandler>>,
        Json(request): Json<ResetRequestDto>,
    ) -> impl IntoResponse {
        match handler.admin.reset(&request.password).await {
            Ok(summary) => (
                StatusCode::OK,
                Json(ApiResponse::success(ResetResponseDto::from(summary))),
            ),
            Err(e) => error_response(&e),
        }
    }
}
