pub mod index_snapshot;

pub use index_snapshot::JsonIndexSnapshotStore;
