//! Flat backend - exact inner-product scan over every stored vector

use std::path::Path;

use tracing::info;

use crate::error::{RagError, RagResult};
use crate::index::{write_matrix, EmbeddingsStore};

use super::traits::BackendSearcher;

/// Exact searcher holding the normalized matrix in memory
pub struct FlatSearcher {
    vectors: Vec<f32>,
    dimensions: usize,
    count: usize,
}

impl FlatSearcher {
    /// Build a searcher directly from rows
    pub fn from_rows(rows: &[Vec<f32>], dimensions: usize) -> RagResult<Self> {
        let mut vectors = Vec::with_capacity(rows.len() * dimensions);
        for row in rows {
            if row.len() != dimensions {
                return Err(RagError::DimensionMismatch {
                    expected: dimensions,
                    actual: row.len(),
                });
            }
            vectors.extend_from_slice(row);
        }

        Ok(Self {
            vectors,
            dimensions,
            count: rows.len(),
        })
    }

    /// Load a flat index from disk
    pub fn load(index_file: &Path, dimensions: usize) -> RagResult<Self> {
        info!("Loading flat index from {:?}", index_file);

        let store = EmbeddingsStore::open(index_file, dimensions)?;
        let count = store.len();

        Ok(Self {
            vectors: store.to_flat_vec(),
            dimensions,
            count,
        })
    }
}

impl BackendSearcher for FlatSearcher {
    fn search(&self, query: &[f32], top_k: usize) -> RagResult<(Vec<u64>, Vec<f32>)> {
        if query.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(u64, f32)> = self
            .vectors
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(i, row)| (i as u64, dot_product(query, row)))
            .collect();

        // Stable sort keeps ingestion order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored.into_iter().unzip())
    }

    fn len(&self) -> usize {
        self.count
    }
}

/// Build a flat index file from normalized rows
pub fn build_index(embeddings: &[Vec<f32>], index_file: &Path, dimensions: usize) -> RagResult<()> {
    info!(
        "Building flat index: {} vectors, {} dims",
        embeddings.len(),
        dimensions
    );

    write_matrix(index_file, dimensions, embeddings)?;

    info!("Flat index saved to {:?}", index_file);
    Ok(())
}

/// Compute dot product (inner product) between two vectors
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
