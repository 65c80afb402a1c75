pub mod in_memory_corpus_repository;
pub mod in_memory_request_repository;

pub use in_memory_corpus_repository::InMemoryCorpusRepository;
pub use in_memory_request_repository::InMemoryRequestRepository;
