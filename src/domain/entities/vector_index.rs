use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::entities::RagDocument;
use crate::domain::errors::DomainError;

/// Immutable collection of embedded documents. Replaced wholesale on rebuild.
///
/// Deserialising goes through [`VectorIndex::build`], so a stored index gets
/// the same id and dimension checks as a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredIndex")]
pub struct VectorIndex {
    documents: Vec<RagDocument>,
    dimension: Option<usize>,
    built_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct StoredIndex {
    documents: Vec<RagDocument>,
    built_at: DateTime<Utc>,
}

impl TryFrom<StoredIndex> for VectorIndex {
    type Error = DomainError;

    fn try_from(stored: StoredIndex) -> Result<Self, Self::Error> {
        let mut index = Self::build(stored.documents)?;
        index.built_at = stored.built_at;
        Ok(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: RagDocument,
    pub similarity: f32,
}

impl VectorIndex {
    pub fn empty() -> Self {
        Self {
            documents: Vec::new(),
            dimension: None,
            built_at: Utc::now(),
        }
    }

    /// Builds an index, requiring unique ids and a single embedding dimension.
    pub fn build(documents: Vec<RagDocument>) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();
        let mut dimension = None;

        for document in &documents {
            if !seen.insert(document.id()) {
                return Err(DomainError::Retrieval(format!(
                    "duplicate document id: {}",
                    document.id()
                )));
            }
            match dimension {
                None if document.dimension() == 0 => {
                    return Err(DomainError::Retrieval(format!(
                        "document {} has an empty embedding",
                        document.id()
                    )));
                }
                None => dimension = Some(document.dimension()),
                Some(d) if d != document.dimension() => {
                    return Err(DomainError::Retrieval(format!(
                        "document {} has dimension {}, expected {}",
                        document.id(),
                        document.dimension(),
                        d
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            documents,
            dimension,
            built_at: Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn documents(&self) -> &[RagDocument] {
        &self.documents
    }

    /// Documents with similarity >= `threshold`, best first, ties by id.
    pub fn search(
        &self,
        query: &[f32],
        threshold: f32,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredDocument>, DomainError> {
        if let Some(dimension) = self.dimension {
            if query.len() != dimension {
                return Err(DomainError::Retrieval(format!(
                    "query embedding has dimension {}, index expects {}",
                    query.len(),
                    dimension
                )));
            }
        }

        let mut hits: Vec<ScoredDocument> = self
            .documents
            .par_iter()
            .map(|document| ScoredDocument {
                similarity: cosine_similarity(query, document.embedding().as_slice()),
                document: document.clone(),
            })
            .filter(|hit| hit.similarity >= threshold)
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.document.id().cmp(b.document.id()))
        });

        if let Some(limit) = limit {
            hits.truncate(limit);
        }

        Ok(hits)
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::empty()
    }
}

/// Accumulates in f64 so a vector compared with itself scores exactly 1.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (mut dot_product, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_nan() {
        0.0
    } else {
        similarity.clamp(-1.0, 1.0) as f32
    }
}
