//! OpenAI embedding provider

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client,
};
use tracing::info;

use crate::http::openai_client;

/// OpenAI embedding provider
pub struct OpenAIEmbedding {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAIEmbedding {
    /// Create a new OpenAI embedding provider
    pub fn new(
        model_name: String,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let client = openai_client(api_key, base_url)?;

        info!("OpenAI embedding provider: {}", model_name);

        Ok(Self { client, model_name })
    }

    /// Compute embeddings
    pub async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Process in batches of 100 (OpenAI limit)
        let batch_size = 100;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            let input: Vec<String> = batch.iter().map(|s| s.to_string()).collect();
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model_name)
                .input(EmbeddingInput::StringArray(input))
                .build()?;

            let response = self.client.embeddings().create(request).await?;

            // The API may reorder results; `index` is authoritative
            let mut data = response.data;
            data.sort_by_key(|d| d.index);
            all_embeddings.extend(data.into_iter().map(|d| d.embedding));
        }

        Ok(all_embeddings)
    }
}
