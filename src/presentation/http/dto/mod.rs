pub mod rag_dto;
pub mod request_dto;
pub mod response_dto;

pub use rag_dto::*;
pub use request_dto::*;
pub use response_dto::*;
