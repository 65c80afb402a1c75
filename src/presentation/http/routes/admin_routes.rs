use axum::{Router, routing::post};
use std::sync::Arc;

use crate::presentation::http::handlers::AdminHandler;

pub fn admin_routes(admin_handler: Arc<AdminHandler>) -> Router {
    Router::new()
        .route("/admin/reset-vector-store", post(AdminHandler::reset_vector_store))
        .with_state(admin_handler)
}
