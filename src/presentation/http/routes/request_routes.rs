use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;

use crate::presentation::http::handlers::RequestHandler;

pub fn request_routes(request_handler: Arc<RequestHandler>) -> Router {
    Router::new()
        .route("/queue-article-generation", post(RequestHandler::create))
        .route("/get-requests/{userid}", get(RequestHandler::list_by_user))
        .route("/get-request-status/{request_id}", get(RequestHandler::get_status))
        .route("/update-request/{request_id}", put(RequestHandler::update))
        .route("/delete-request/{request_id}", delete(RequestHandler::delete))
        .route("/requeue-request/{request_id}", post(RequestHandler::requeue))
        .with_state(request_handler)
}
