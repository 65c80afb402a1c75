pub mod generation_client;
pub mod inference_client;

pub use generation_client::GenerationClient;
pub use inference_client::InferenceEmbeddingProvider;
