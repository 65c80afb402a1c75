pub mod active_index;
pub mod article_generation;
pub mod rag_service;
pub mod request_lifecycle;
pub mod vector_store_admin;

pub use active_index::ActiveIndex;
pub use article_generation::ArticleGenerationService;
pub use rag_service::{AnswerEvent, RagService, RagSettings};
pub use request_lifecycle::{CreateRequest, CreateResponse, RequestLifecycleService};
pub use vector_store_admin::{RebuildSummary, VectorStoreAdmin};
