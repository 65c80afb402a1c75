use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    application::{
        ports::{EmbeddingProvider, GenerationProvider, IndexSnapshotStore},
        services::{
            ActiveIndex, ArticleGenerationService, RagService, RagSettings,
            RequestLifecycleService, VectorStoreAdmin,
        },
    },
    domain::repositories::{CorpusRepository, RequestRepository},
    infrastructure::{
        config::{AppConfig, RequestStoreKind},
        database::{
            create_connection_pool,
            repositories::{PostgresCorpusRepository, PostgresRequestRepository},
            run_migrations,
        },
        external_services::{GenerationClient, InferenceEmbeddingProvider},
        file_system::JsonIndexSnapshotStore,
        memory::{InMemoryCorpusRepository, InMemoryRequestRepository},
        messaging::BackgroundWorker,
    },
    presentation::http::{
        HttpServer,
        handlers::{AdminHandler, RagHandler, RequestHandler},
    },
};

/// The collaborators that differ between deployments and tests.
pub struct ExternalServices {
    pub request_repository: Arc<dyn RequestRepository>,
    pub corpus_repository: Arc<dyn CorpusRepository>,
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub generation_provider: Arc<dyn GenerationProvider>,
    pub snapshot_store: Arc<dyn IndexSnapshotStore>,
}

pub struct AppContainer {
    pub config: AppConfig,

    // Shared state
    pub active_index: Arc<ActiveIndex>,

    // Application Services
    pub lifecycle: Arc<RequestLifecycleService>,
    pub rag_service: Arc<RagService>,
    pub vector_store_admin: Arc<VectorStoreAdmin>,

    // Background Processing
    pub background_worker: Arc<BackgroundWorker>,

    // HTTP Handlers
    pub request_handler: Arc<RequestHandler>,
    pub rag_handler: Arc<RagHandler>,
    pub admin_handler: Arc<AdminHandler>,
}

impl AppContainer {
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = match &config.database_url {
            Some(database_url) => {
                run_migrations(database_url)
                    .map_err(|e| format!("Failed to run database migrations: {}", e))?;
                Some(create_connection_pool(database_url)?)
            }
            None => None,
        };

        let request_repository: Arc<dyn RequestRepository> = match (config.request_store, &pool) {
            (RequestStoreKind::Postgres, Some(pool)) => {
                Arc::new(PostgresRequestRepository::new(pool.clone()))
            }
            (RequestStoreKind::Postgres, None) => return Err("DATABASE_URL not set".into()),
            (RequestStoreKind::Memory, _) => {
                warn!("Using the in-memory request store; requests are lost on restart");
                Arc::new(InMemoryRequestRepository::new())
            }
        };

        let corpus_repository: Arc<dyn CorpusRepository> = match &pool {
            Some(pool) => Arc::new(PostgresCorpusRepository::new(pool.clone())),
            None => {
                warn!("No database configured; the RAG corpus is empty");
                Arc::new(InMemoryCorpusRepository::default())
            }
        };

        let services = ExternalServices {
            request_repository,
            corpus_repository,
            embedding_provider: Arc::new(InferenceEmbeddingProvider::from_url(
                config.embeddings_service_url.clone(),
            )?),
            generation_provider: Arc::new(GenerationClient::from_url(
                config.generation_service_url.clone(),
            )?),
            snapshot_store: Arc::new(JsonIndexSnapshotStore::new(config.vector_store_path.clone())),
        };

        Ok(Self::from_parts(config, services))
    }

    pub fn from_parts(config: AppConfig, services: ExternalServices) -> Self {
        let active_index = Arc::new(ActiveIndex::default());

        let lifecycle = Arc::new(RequestLifecycleService::new(
            services.request_repository.clone(),
            config.default_model.clone(),
            config.request_processing_minutes,
        ));

        let rag_service = Arc::new(RagService::new(
            services.embedding_provider.clone(),
            services.generation_provider.clone(),
            active_index.clone(),
            RagSettings {
                model: config.rag_model.clone(),
                system_prompt: config.rag_system_prompt.clone(),
                top_k: config.similarity_top_k,
            },
        ));

        let vector_store_admin = Arc::new(VectorStoreAdmin::new(
            services.corpus_repository,
            services.embedding_provider,
            services.snapshot_store,
            active_index.clone(),
            config.admin_password.clone(),
            config.corpus_url_template.clone(),
        ));

        let background_worker = Arc::new(BackgroundWorker::new(
            services.request_repository,
            Arc::new(ArticleGenerationService::new(services.generation_provider)),
            config.worker.clone(),
        ));

        let request_handler = Arc::new(RequestHandler::new(lifecycle.clone()));
        let rag_handler = Arc::new(RagHandler::new(rag_service.clone()));
        let admin_handler = Arc::new(AdminHandler::new(vector_store_admin.clone()));

        Self {
            config,
            active_index,
            lifecycle,
            rag_service,
            vector_store_admin,
            background_worker,
            request_handler,
            rag_handler,
            admin_handler,
        }
    }

    pub fn http_server(&self) -> HttpServer {
        HttpServer::new(
            self.request_handler.clone(),
            self.rag_handler.clone(),
            self.admin_handler.clone(),
            self.active_index.clone(),
            Some(self.config.port),
        )
    }

    /// Serves the persisted index if there is one; otherwise builds it in the
    /// background so startup isn't blocked on the embedding service.
    pub async fn warm_index(&self) {
        match self.vector_store_admin.restore_from_snapshot().await {
            Ok(true) => return,
            Ok(false) => info!("No index snapshot found; building from corpus"),
            Err(e) => warn!(error = %e, "Could not read index snapshot; rebuilding"),
        }

        let admin = self.vector_store_admin.clone();
        tokio::spawn(async move {
            if let Err(e) = admin.rebuild().await {
                warn!(error = %e, "Initial index build failed; retry with the reset endpoint");
            }
        });
    }
}
