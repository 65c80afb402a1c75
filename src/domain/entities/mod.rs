pub mod generation_request;
pub mod rag_document;
pub mod vector_index;

pub use generation_request::{GenerationRequest, RequestPatch};
pub use rag_document::{CorpusDocument, RagDocument};
pub use vector_index::{ScoredDocument, VectorIndex};
