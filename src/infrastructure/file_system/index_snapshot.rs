use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

use crate::application::ports::index_snapshot_store::{IndexSnapshotStore, SnapshotError};
use crate::domain::entities::VectorIndex;

const SNAPSHOT_FILE: &str = "index.json";

/// Keeps the vector index as a JSON file under `base_path`.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// reader never sees a partial snapshot.
pub struct JsonIndexSnapshotStore {
    base_path: PathBuf,
}

impl JsonIndexSnapshotStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.base_path.join(SNAPSHOT_FILE)
    }
}

#[async_trait]
impl IndexSnapshotStore for JsonIndexSnapshotStore {
    async fn load(&self) -> Result<Option<VectorIndex>, SnapshotError> {
        let bytes = match fs::read(self.snapshot_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SnapshotError::IoError(e.to_string())),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| SnapshotError::SerializationError(e.to_string()))
    }

    async fn save(&self, index: &VectorIndex) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| SnapshotError::IoError(e.to_string()))?;

        let bytes =
            serde_json::to_vec(index).map_err(|e| SnapshotError::SerializationError(e.to_string()))?;

        let tmp_path = self.base_path.join(format!("{}.tmp", SNAPSHOT_FILE));
        fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| SnapshotError::IoError(e.to_string()))?;
        fs::rename(&tmp_path, self.snapshot_path())
            .await
            .map_err(|e| SnapshotError::IoError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::RagDocument;
    use pgvector::Vector;
    use std::collections::BTreeMap;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("article-queue-snapshot-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_snapshot_loads_as_none() {
        let store = JsonIndexSnapshotStore::new(scratch_dir());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_saved_index_loads_back() {
        let dir = scratch_dir();
        let store = JsonIndexSnapshotStore::new(dir.clone());

        let mut metadata = BTreeMap::new();
        metadata.insert("title".to_string(), "Tides".to_string());
        let index = VectorIndex::build(vec![RagDocument::new(
            "1",
            Vector::from(vec![0.25, 0.5]),
            "The moon pulls the sea.".to_string(),
            metadata,
        )])
        .unwrap();

        store.save(&index).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, index);
        assert!(!dir.join("index.json.tmp").exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.json"), b"{not json").unwrap();

        let store = JsonIndexSnapshotStore::new(dir.clone());
        assert!(matches!(
            store.load().await,
            Err(SnapshotError::SerializationError(_))
        ));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_snapshot_with_duplicate_ids_is_rejected() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();

        let document = RagDocument::new(
            "1",
            Vector::from(vec![0.25, 0.5]),
            "The moon pulls the sea.".to_string(),
            BTreeMap::new(),
        );
        let mut json = serde_json::to_value(VectorIndex::build(vec![document]).unwrap()).unwrap();
        let first = json["documents"][0].clone();
        json["documents"].as_array_mut().unwrap().push(first);
        std::fs::write(dir.join("index.json"), serde_json::to_vec(&json).unwrap()).unwrap();

        let store = JsonIndexSnapshotStore::new(dir.clone());
        match store.load().await {
            Err(SnapshotError::SerializationError(message)) => {
                assert!(message.contains("duplicate document id"), "{}", message)
            }
            other => panic!("expected a rejected snapshot, got {:?}", other.map(|i| i.map(|i| i.len()))),
        }

        let _ = std::fs::remove_dir_all(dir);
    }
}
