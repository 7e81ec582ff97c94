//! Backend module - vector search backends (flat, HNSW)

mod flat;
mod hnsw;
mod traits;

pub use flat::FlatSearcher;
pub use traits::BackendSearcher;

use std::path::Path;
use std::str::FromStr;

use crate::error::RagResult;

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Exact inner-product scan
    Flat,
    /// usearch HNSW graph
    Hnsw,
}

impl BackendType {
    pub fn name(self) -> &'static str {
        match self {
            BackendType::Flat => "flat",
            BackendType::Hnsw => "hnsw",
        }
    }

    /// Build an index file from normalized embeddings
    pub fn build(self, embeddings: &[Vec<f32>], index_file: &Path, dimensions: usize) -> RagResult<()> {
        match self {
            BackendType::Flat => flat::build_index(embeddings, index_file, dimensions),
            BackendType::Hnsw => hnsw::build_index(embeddings, index_file, dimensions),
        }
    }

    /// Load a searcher for this backend type
    pub fn load_searcher(
        self,
        index_file: &Path,
        dimensions: usize,
    ) -> RagResult<Box<dyn BackendSearcher>> {
        match self {
            BackendType::Flat => Ok(Box::new(FlatSearcher::load(index_file, dimensions)?)),
            BackendType::Hnsw => Ok(Box::new(hnsw::HnswSearcher::load(index_file, dimensions)?)),
        }
    }
}

impl FromStr for BackendType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(BackendType::Flat),
            "hnsw" => Ok(BackendType::Hnsw),
            _ => anyhow::bail!("Unknown backend: {} (expected flat or hnsw)", s),
        }
    }
}
