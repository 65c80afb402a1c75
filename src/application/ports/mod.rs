pub mod embedding_provider;
pub mod generation_provider;
pub mod index_snapshot_store;

pub use embedding_provider::EmbeddingProvider;
pub use generation_provider::{GenerationPrompt, GenerationProvider, TextStream};
pub use index_snapshot_store::IndexSnapshotStore;
