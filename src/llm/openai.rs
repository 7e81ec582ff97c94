//! OpenAI LLM provider

use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use tracing::info;

use crate::http::openai_client;

/// OpenAI (or compatible) chat completions provider
pub struct OpenAILlm {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAILlm {
    /// Create a new OpenAI LLM provider
    pub fn new(
        model_name: String,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let client = openai_client(api_key, base_url)?;

        info!("OpenAI LLM provider: {}", model_name);

        Ok(Self { client, model_name })
    }

    /// Generate a response
    pub async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into()])
            .max_tokens(1000u32)
            .temperature(0.0)
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("OpenAI returned no completion choices"))?;

        Ok(content)
    }
}
