//! HTTP utilities for API providers

use std::time::Duration;

use reqwest::{Client, Response};

/// Create a reqwest client with connection pooling and sensible defaults
///
/// Per-call deadlines for completions are enforced by the caller; the client
/// timeout is only a backstop for hung connections.
pub fn create_client() -> anyhow::Result<Client> {
    let client = Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(600))
        .connect_timeout(Duration::from_secs(30))
        .build()?;
    Ok(client)
}

/// Ollama base URL: explicit setting, then `GROUNDED_OLLAMA_HOST`, then `OLLAMA_HOST`
pub fn ollama_host(host: Option<String>) -> String {
    host.or_else(|| std::env::var("GROUNDED_OLLAMA_HOST").ok())
        .or_else(|| std::env::var("OLLAMA_HOST").ok())
        .unwrap_or_else(|| "http://localhost:11434".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// OpenAI-compatible client; key and base URL fall back to `OPENAI_API_KEY` / `OPENAI_BASE_URL`
pub fn openai_client(
    api_key: Option<String>,
    base_url: Option<String>,
) -> anyhow::Result<async_openai::Client<async_openai::config::OpenAIConfig>> {
    let api_key = api_key
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let mut config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
    if let Some(base_url) = base_url.or_else(|| std::env::var("OPENAI_BASE_URL").ok()) {
        config = config.with_api_base(base_url);
    }

    Ok(async_openai::Client::with_config(config))
}

/// Check HTTP response status and return detailed error if not successful
///
/// This helper extracts error details from the response body for better debugging.
pub async fn check_response(response: Response, service_name: &str) -> anyhow::Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    anyhow::bail!("{} API error {}: {}", service_name, status, error_detail(body))
}

/// Pull the human-readable message out of common API error bodies
fn error_detail(body: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => json
            .get("error")
            .and_then(|e| e.get("message").and_then(|m| m.as_str()).or_else(|| e.as_str()))
            .or_else(|| json.get("message").and_then(|m| m.as_str()))
            .or_else(|| json.get("detail").and_then(|d| d.as_str()))
            .map(|s| s.to_string())
            .unwrap_or(body),
        Err(_) => body,
    }
}
