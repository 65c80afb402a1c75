pub mod postgres_corpus_repository;
pub mod postgres_request_repository;

pub use postgres_corpus_repository::PostgresCorpusRepository;
pub use postgres_request_repository::PostgresRequestRepository;
