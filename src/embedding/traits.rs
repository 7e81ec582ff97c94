//! Embedding provider traits

use async_trait::async_trait;

use crate::error::RagResult;

/// Maps text to fixed-dimension vectors
///
/// Implementations must return one vector per input text, every vector
/// `dimensions()` long, and the same output for the same input.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier recorded in the index manifest
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Compute embeddings for texts
    async fn embed(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>>;
}
