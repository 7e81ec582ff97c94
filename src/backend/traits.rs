//! Backend traits for vector search

use crate::error::RagResult;

/// Trait for searching a vector index
pub trait BackendSearcher: Send + Sync {
    /// Search for the `top_k` vectors with the highest inner product
    ///
    /// Returns (positions, similarities) where positions are offsets into the
    /// ingestion order and similarities are sorted descending. Fewer than
    /// `top_k` pairs come back when the index holds fewer vectors.
    fn search(&self, query: &[f32], top_k: usize) -> RagResult<(Vec<u64>, Vec<f32>)>;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
