use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::services::RequestLifecycleService;
use crate::domain::errors::DomainError;
use crate::presentation::http::dto::{
    ApiResponse, CreateRequestDto, CreateResponseDto, MessageResponseDto, RequestDto,
    UpdateRequestDto, error_response,
};

pub struct RequestHandler {
    lifecycle: Arc<RequestLifecycleService>,
}

impl RequestHandler {
    pub fn new(lifecycle: Arc<RequestLifecycleService>) -> Self {
        Self { lifecycle }
    }

    pub async fn create(
        State(handler): State<Arc<RequestHandler>>,
        Json(request): Json<CreateRequestDto>,
    ) -> impl IntoResponse {
        match handler.lifecycle.create(request.into()).await {
            Ok(response) => (
                StatusCode::ACCEPTED,
                Json(ApiResponse::success(CreateResponseDto::from(response))),
            ),
            Err(e) => error_response(&e),
        }
    }

    pub async fn list_by_user(
        State(handler): State<Arc<RequestHandler>>,
        Path(userid): Path<String>,
    ) -> impl IntoResponse {
        match handler.lifecycle.list_by_user(&userid).await {
            Ok(requests) => {
                let dtos: Vec<RequestDto> = requests.into_iter().map(RequestDto::from).collect();
                (StatusCode::OK, Json(ApiResponse::success(dtos)))
            }
            Err(e) => error_response(&e),
        }
    }

    pub async fn get_status(
        State(handler): State<Arc<RequestHandler>>,
        Path(request_id): Path<String>,
    ) -> impl IntoResponse {
        let request_id = match parse_request_id(&request_id) {
            Ok(id) => id,
            Err(e) => return error_response::<RequestDto>(&e),
        };
        match handler.lifecycle.get_status(request_id).await {
            Ok(request) => (StatusCode::OK, Json(ApiResponse::success(RequestDto::from(request)))),
            Err(e) => error_response(&e),
        }
    }

    pub async fn update(
        State(handler): State<Arc<RequestHandler>>,
        Path(request_id): Path<String>,
        Json(update): Json<UpdateRequestDto>,
    ) -> impl IntoResponse {
        let request_id = match parse_request_id(&request_id) {
            Ok(id) => id,
            Err(e) => return error_response::<RequestDto>(&e),
        };
        match handler.lifecycle.update(request_id, update.into()).await {
            Ok(request) => (StatusCode::OK, Json(ApiResponse::success(RequestDto::from(request)))),
            Err(e) => error_response(&e),
        }
    }

    pub async fn delete(
        State(handler): State<Arc<RequestHandler>>,
        Path(request_id): Path<String>,
    ) -> impl IntoResponse {
        let request_id = match parse_request_id(&request_id) {
            Ok(id) => id,
            Err(e) => return error_response::<MessageResponseDto>(&e),
        };
        match handler.lifecycle.delete(request_id).await {
            Ok(()) => (
                StatusCode::OK,
                Json(ApiResponse::success(MessageResponseDto {
                    message: format!("Request {} deleted", request_id),
                })),
            ),
            Err(e) => error_response(&e),
        }
    }

    pub async fn requeue(
        State(handler): State<Arc<RequestHandler>>,
        Path(request_id): Path<String>,
    ) -> impl IntoResponse {
        let request_id = match parse_request_id(&request_id) {
            Ok(id) => id,
            Err(e) => return error_response::<RequestDto>(&e),
        };
        match handler.lifecycle.requeue(request_id).await {
            Ok(request) => (StatusCode::OK, Json(ApiResponse::success(RequestDto::from(request)))),
            Err(e) => error_response(&e),
        }
    }
}

// Parsed here rather than by the extractor so a bad id gets the JSON envelope.
fn parse_request_id(raw: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| DomainError::Validation(format!("invalid request id: {}", raw)))
}
