//! Ollama embedding provider

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http::{check_response, create_client, ollama_host};

/// Ollama embedding provider
pub struct OllamaEmbedding {
    client: Client,
    host: String,
    model_name: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding provider
    pub fn new(model_name: String, host: Option<String>) -> anyhow::Result<Self> {
        let host = ollama_host(host);

        let client = create_client()?;

        info!("Ollama embedding provider: {} @ {}", model_name, host);

        Ok(Self {
            client,
            host,
            model_name,
        })
    }

    /// Compute embeddings
    pub async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Process in batches of 32 (Ollama recommendation)
        let batch_size = 32;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            let request = EmbedRequest {
                model: &self.model_name,
                input: batch,
            };

            let response = self
                .client
                .post(format!("{}/api/embed", self.host))
                .json(&request)
                .send()
                .await?;

            let response = check_response(response, "Ollama").await?;
            let embed_response: EmbedResponse = response.json().await?;

            if embed_response.embeddings.len() != batch.len() {
                anyhow::bail!(
                    "Ollama returned {} embeddings for {} inputs",
                    embed_response.embeddings.len(),
                    batch.len()
                );
            }
            all_embeddings.extend(embed_response.embeddings);
        }

        Ok(all_embeddings)
    }
}
