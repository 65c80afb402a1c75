use std::sync::{Arc, RwLock};

use crate::domain::entities::VectorIndex;

/// The index currently serving queries.
///
/// Readers take a cheap `Arc` snapshot and never observe a half-built index;
/// the writer swaps the whole pointer.
#[derive(Debug, Default)]
pub struct ActiveIndex {
    current: RwLock<Arc<VectorIndex>>,
}

impl ActiveIndex {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn current(&self) -> Arc<VectorIndex> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Installs `index` and returns the one it replaced.
    pub fn replace(&self, index: VectorIndex) -> Arc<VectorIndex> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(index))
    }

    pub fn document_count(&self) -> usize {
        self.current().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::RagDocument;
    use pgvector::Vector;
    use std::collections::BTreeMap;

    #[test]
    fn test_readers_keep_their_snapshot_across_swap() {
        let active = ActiveIndex::default();
        let before = active.current();

        let doc = RagDocument::new("a", Vector::from(vec![1.0]), "a".into(), BTreeMap::new());
        let previous = active.replace(VectorIndex::build(vec![doc]).unwrap());

        assert!(before.is_empty());
        assert!(previous.is_empty());
        assert_eq!(active.document_count(), 1);
    }
}
