use axum::Router;
use std::future::Future;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::application::services::ActiveIndex;
use crate::presentation::http::{
    handlers::{AdminHandler, RagHandler, RequestHandler},
    routes::{admin_routes, health_routes, rag_routes, request_routes},
};

pub struct HttpServer {
    request_handler: Arc<RequestHandler>,
    rag_handler: Arc<RagHandler>,
    admin_handler: Arc<AdminHandler>,
    active_index: Arc<ActiveIndex>,
    port: u16,
}

impl HttpServer {
    pub fn new(
        request_handler: Arc<RequestHandler>,
        rag_handler: Arc<RagHandler>,
        admin_handler: Arc<AdminHandler>,
        active_index: Arc<ActiveIndex>,
        port: Option<u16>,
    ) -> Self {
        Self {
            request_handler,
            rag_handler,
            admin_handler,
            active_index,
            port: port.unwrap_or(3000),
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .merge(health_routes(self.active_index.clone()))
            .merge(request_routes(self.request_handler.clone()))
            .merge(rag_routes(self.rag_handler.clone()))
            .merge(admin_routes(self.admin_handler.clone()))
            .layer(cors)
            .layer(RequestBodyLimitLayer::new(1024 * 1024)) // 1MB cap
            .layer(
                TraceLayer::new_for_http()
                    .on_request(
                        |request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                            tracing::info!(
                                "Received request: {} {}",
                                request.method(),
                                request.uri()
                            );
                        },
                    )
                    .on_response(
                        |response: &axum::http::Response<axum::body::Body>,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::info!(
                                "Response: {} (took {} ms)",
                                response.status(),
                                latency.as_millis()
                            );
                        },
                    )
                    .on_failure(
                        |error: ServerErrorsFailureClass,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::error!(
                                "Request failed: {:?} (took {} ms)",
                                error,
                                latency.as_millis()
                            );
                        },
                    ),
            )
    }

    /// Serves until `shutdown` resolves, then lets in-flight requests finish.
    pub async fn run<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::infrastructure::config::AppConfig;
    use crate::infrastructure::container::{AppContainer, ExternalServices};
    use crate::infrastructure::memory::InMemoryRequestRepository;
    use crate::test_support::{
        KeywordEmbedding, MemorySnapshotStore, ScriptedGeneration, StaticCorpus, corpus_doc,
    };

    fn container() -> AppContainer {
        let config = AppConfig::from_lookup(|key| {
            let value = match key {
                "REQUEST_STORE" => Some("memory"),
                "ADMIN_PASSWORD" => Some("s3cret"),
                "EMBEDDINGS_SERVICE_URL" => Some("http://embed.local/v1"),
                "GENERATION_SERVICE_URL" => Some("http://gen.local/v1/generate"),
                _ => None,
            };
            value.map(str::to_string)
        })
        .unwrap();

        AppContainer::from_parts(
            config,
            ExternalServices {
                request_repository: Arc::new(InMemoryRequestRepository::new()),
                corpus_repository: Arc::new(StaticCorpus::new(vec![
                    corpus_doc("1", "Rust ownership", "<p>Borrowing rules</p>"),
                    corpus_doc("2", "Async Rust", "<p>Futures and executors</p>"),
                ])),
                embedding_provider: Arc::new(KeywordEmbedding::new(&[], vec![1.0, 0.0])),
                generation_provider: Arc::new(ScriptedGeneration::streaming(&["Hello", " world"])),
                snapshot_store: Arc::new(MemorySnapshotStore::default()),
            },
        )
    }

    fn app(container: &AppContainer) -> Router {
        container.http_server().router()
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn new_request() -> Value {
        json!({"user_query": "write about ferris", "name": "Ann", "userid": "u-1"})
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let container = container();
        let app = app(&container);

        let (status, body) = send_json(&app, Method::POST, "/queue-article-generation", Some(new_request())).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "QUEUED");

        let id = body["data"]["request_id"].as_str().unwrap().to_string();
        let (status, body) = send_json(&app, Method::GET, &format!("/get-request-status/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["userid"], "u-1");

        let (status, body) = send_json(&app, Method::GET, "/get-requests/u-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected() {
        let container = container();
        let (status, body) = send_json(
            &app(&container),
            Method::POST,
            "/queue-article-generation",
            Some(json!({"name": "Ann", "userid": "u-1"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_request_is_not_found() {
        let container = container();
        let uri = format!("/get-request-status/{}", uuid::Uuid::new_v4());
        let (status, body) = send_json(&app(&container), Method::GET, &uri, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"]["code"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_id_gets_error_envelope() {
        let container = container();
        let app = app(&container);

        for (method, uri) in [
            (Method::GET, "/get-request-status/not-a-uuid"),
            (Method::DELETE, "/delete-request/42"),
            (Method::POST, "/requeue-request/xyz"),
        ] {
            let (status, body) = send_json(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["success"], false);
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_finished_request_cannot_be_deleted() {
        let container = container();
        let app = app(&container);

        let (_, body) = send_json(&app, Method::POST, "/queue-article-generation", Some(new_request())).await;
        let id = body["data"]["request_id"].as_str().unwrap().to_string();

        let report = container.background_worker.tick().await.unwrap();
        assert_eq!(report.completed, 1);

        let (status, body) = send_json(&app, Method::DELETE, &format!("/delete-request/{}", id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["details"], "current status: COMPLETED");

        let (status, body) = send_json(&app, Method::GET, &format!("/get-request-status/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "COMPLETED");
    }

    #[tokio::test]
    async fn test_reset_requires_password() {
        let container = container();
        let app = app(&container);

        let (status, _) = send_json(
            &app,
            Method::POST,
            "/admin/reset-vector-store",
            Some(json!({"password": "guess"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/admin/reset-vector-store",
            Some(json!({"password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, health) = send_json(&app, Method::GET, "/health", None).await;
        assert_eq!(health["data"]["index_documents"], 2);
    }

    #[tokio::test]
    async fn test_askllm_streams_ndjson() {
        let container = container();
        let response = app(&container)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/askllm")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"query": "what is rust?"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-ndjson"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let lines: Vec<Value> = String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines[0]["type"], "partial");
        let last = lines.last().unwrap();
        assert_eq!(last["type"], "complete");
        assert_eq!(last["done"], true);
    }

    #[tokio::test]
    async fn test_askllm_rejects_empty_query() {
        let container = container();
        let (status, body) = send_json(
            &app(&container),
            Method::POST,
            "/askllm",
            Some(json!({"query": "   "})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_health_reports_empty_index() {
        let container = container();
        let (status, body) = send_json(&app(&container), Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["index_documents"], 0);
    }
}
