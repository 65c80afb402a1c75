pub mod corpus_repository;
pub mod request_repository;

pub use corpus_repository::CorpusRepository;
pub use request_repository::{RequestRepository, StatusChange};
