//! HNSW backend using usearch crate
//!
//! Approximate; intended for corpora too large for the flat scan.

use std::path::Path;

use tracing::info;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::{RagError, RagResult};

use super::traits::BackendSearcher;

const CONNECTIVITY: usize = 32;
const EXPANSION: usize = 64;

fn options(dimensions: usize) -> IndexOptions {
    IndexOptions {
        dimensions,
        metric: MetricKind::IP, // Inner product (MIPS)
        quantization: ScalarKind::F32,
        connectivity: CONNECTIVITY,
        expansion_add: EXPANSION,
        expansion_search: EXPANSION,
        multi: false,
    }
}

fn backend_err(e: impl std::fmt::Display) -> RagError {
    RagError::Backend(e.to_string())
}

/// HNSW searcher using usearch
pub struct HnswSearcher {
    index: Index,
}

impl HnswSearcher {
    /// Load an HNSW index from disk
    pub fn load(index_file: &Path, dimensions: usize) -> RagResult<Self> {
        info!("Loading HNSW index from {:?}", index_file);

        let index = Index::new(&options(dimensions)).map_err(backend_err)?;
        index
            .load(index_file.to_string_lossy().as_ref())
            .map_err(|e| RagError::corrupt(index_file, format!("usearch load failed: {}", e)))?;

        info!("Loaded HNSW index with {} vectors", index.size());

        Ok(Self { index })
    }
}

impl BackendSearcher for HnswSearcher {
    fn search(&self, query: &[f32], top_k: usize) -> RagResult<(Vec<u64>, Vec<f32>)> {
        if query.len() != self.index.dimensions() {
            return Err(RagError::DimensionMismatch {
                expected: self.index.dimensions(),
                actual: query.len(),
            });
        }
        if top_k == 0 || self.index.size() == 0 {
            return Ok((Vec::new(), Vec::new()));
        }

        let results = self.index.search(query, top_k).map_err(backend_err)?;

        // usearch reports IP as a distance (1 - dot); convert back to similarity
        let scores = results.distances.iter().map(|d| 1.0 - d).collect();

        Ok((results.keys.to_vec(), scores))
    }

    fn len(&self) -> usize {
        self.index.size()
    }
}

/// Build an HNSW index from normalized rows
pub fn build_index(embeddings: &[Vec<f32>], index_file: &Path, dimensions: usize) -> RagResult<()> {
    info!(
        "Building HNSW index: {} vectors, {} dims, degree={}, complexity={}",
        embeddings.len(),
        dimensions,
        CONNECTIVITY,
        EXPANSION
    );

    let index = Index::new(&options(dimensions)).map_err(backend_err)?;
    index.reserve(embeddings.len()).map_err(backend_err)?;

    for (i, embedding) in embeddings.iter().enumerate() {
        index.add(i as u64, embedding.as_slice()).map_err(backend_err)?;
    }

    index
        .save(index_file.to_string_lossy().as_ref())
        .map_err(backend_err)?;

    info!("HNSW index saved to {:?}", index_file);

    Ok(())
}
