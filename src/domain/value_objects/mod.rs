pub mod generated_article;
pub mod request_status;

pub use generated_article::GeneratedArticle;
pub use request_status::RequestStatus;
