use axum::{Router, routing::post};
use std::sync::Arc;

use crate::presentation::http::handlers::RagHandler;

pub fn rag_routes(rag_handler: Arc<RagHandler>) -> Router {
    Router::new()
        .route("/askllm", post(RagHandler::ask))
        .with_state(rag_handler)
}
