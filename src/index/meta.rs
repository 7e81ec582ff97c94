//! Index manifest handling

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RagResult;

/// Current manifest format version
pub const META_VERSION: &str = "1";

/// Manifest stored alongside the index artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Metadata format version
    pub version: String,

    /// Backend used (flat, hnsw)
    pub backend_name: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Embedding dimensions
    pub dimensions: usize,

    /// Total number of passages
    pub passage_count: usize,
}

impl IndexMeta {
    /// Load metadata from a JSON file
    pub fn load(path: &Path) -> RagResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let meta: IndexMeta = serde_json::from_str(&content)?;
        Ok(meta)
    }

    /// Save metadata to a JSON file
    pub fn save(&self, path: &Path) -> RagResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
