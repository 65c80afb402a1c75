pub mod admin_handler;
pub mod rag_handler;
pub mod request_handler;

pub use admin_handler::AdminHandler;
pub use rag_handler::RagHandler;
pub use request_handler::RequestHandler;
