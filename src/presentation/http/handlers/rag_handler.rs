use axum::{
    Json,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use std::{convert::Infallible, sync::Arc};

use crate::application::services::{AnswerEvent, RagService};
use crate::presentation::http::dto::{AskRequestDto, error_response};

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

pub struct RagHandler {
    rag: Arc<RagService>,
}

impl RagHandler {
    pub fn new(rag: Arc<RagService>) -> Self {
        Self { rag }
    }

    /// Streams the answer as NDJSON. Input errors get the JSON error envelope
    /// instead, before any streaming starts.
    pub async fn ask(
        State(handler): State<Arc<RagHandler>>,
        Json(request): Json<AskRequestDto>,
    ) -> Response {
        let events = match handler.rag.ask(request.query, request.similarity_threshold) {
            Ok(events) => events,
            Err(e) => return error_response::<()>(&e).into_response(),
        };

        let body = Body::from_stream(events.map(|event| Ok::<_, Infallible>(ndjson_line(&event))));

        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
            body,
        )
            .into_response()
    }
}

fn ndjson_line(event: &AnswerEvent) -> String {
    let mut line = serde_json::to_string(event).unwrap_or_else(|e| {
        serde_json::json!({"type": "error", "message": e.to_string(), "done": true}).to_string()
    });
    line.push('\n');
    line
}
