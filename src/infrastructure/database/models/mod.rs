pub mod corpus_model;
pub mod request_model;

pub use corpus_model::*;
pub use request_model::*;
