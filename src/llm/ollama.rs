//! Ollama LLM provider

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http::{check_response, create_client, ollama_host};

/// Ollama LLM provider
pub struct OllamaLlm {
    client: Client,
    host: String,
    model_name: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done: bool,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider
    pub fn new(model_name: String, host: Option<String>) -> anyhow::Result<Self> {
        let host = ollama_host(host);

        let client = create_client()?;

        info!("Ollama LLM provider: {} @ {}", model_name, host);

        Ok(Self {
            client,
            host,
            model_name,
        })
    }

    /// Generate a response
    pub async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let request = GenerateRequest {
            model: &self.model_name,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&request)
            .send()
            .await?;

        let response = check_response(response, "Ollama").await?;
        let text = response.text().await?;

        Ok(collect_response(&text))
    }
}

/// Join the `response` fields of a (possibly streamed) NDJSON body
fn collect_response(body: &str) -> String {
    let mut full_response = String::new();
    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        if let Ok(resp) = serde_json::from_str::<GenerateResponse>(line) {
            full_response.push_str(&resp.response);
            if resp.done {
                break;
            }
        }
    }
    full_response
}
