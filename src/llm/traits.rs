//! Completion provider trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::GenerationError;

/// Text-in, text-out completion backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt`, giving up after `timeout`
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError>;
}
