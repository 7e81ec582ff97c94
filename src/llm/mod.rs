//! LLM module - completion backends used for generation and verification

mod command;
mod ollama;
mod openai;
mod traits;

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::GenerationConfig;
use crate::error::GenerationError;

pub use traits::CompletionProvider;

/// LLM provider type
#[derive(Debug, Clone)]
pub enum LlmType {
    Ollama { host: Option<String> },
    OpenAI { api_key: Option<String>, base_url: Option<String> },
    Command { program: String, args: Vec<String> },
}

impl LlmType {
    pub fn from_config(config: &GenerationConfig) -> anyhow::Result<Self> {
        match config.provider.as_str() {
            "ollama" => Ok(LlmType::Ollama {
                host: config.host.clone(),
            }),
            "openai" => Ok(LlmType::OpenAI {
                api_key: config.api_key.clone(),
                base_url: config.base_url.clone(),
            }),
            "command" => {
                let mut argv = config.command.clone().unwrap_or_default().into_iter();
                let program = argv.next().ok_or_else(|| {
                    anyhow::anyhow!("generation.command must name a program for the command provider")
                })?;
                Ok(LlmType::Command {
                    program,
                    args: argv.collect(),
                })
            }
            other => anyhow::bail!(
                "Unknown generation provider: {}. Use: ollama, openai, command",
                other
            ),
        }
    }
}

/// Unified LLM provider
pub struct LlmProvider {
    model_name: String,
    inner: LlmProviderInner,
}

enum LlmProviderInner {
    Ollama(ollama::OllamaLlm),
    OpenAI(openai::OpenAILlm),
    Command(command::CommandLlm),
}

impl LlmProvider {
    /// Create a new LLM provider
    pub fn new(model_name: String, llm_type: LlmType) -> anyhow::Result<Self> {
        let inner = match llm_type {
            LlmType::Ollama { host } => {
                LlmProviderInner::Ollama(ollama::OllamaLlm::new(model_name.clone(), host)?)
            }
            LlmType::OpenAI { api_key, base_url } => {
                LlmProviderInner::OpenAI(openai::OpenAILlm::new(model_name.clone(), api_key, base_url)?)
            }
            LlmType::Command { program, args } => {
                LlmProviderInner::Command(command::CommandLlm::new(program, args))
            }
        };

        info!("Initialized LLM provider: {}", model_name);

        Ok(Self { model_name, inner })
    }

    pub fn from_config(config: &GenerationConfig) -> anyhow::Result<Self> {
        Self::new(config.model.clone(), LlmType::from_config(config)?)
    }

    /// Generate a response without a deadline
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        match &self.inner {
            LlmProviderInner::Ollama(llm) => Ok(llm.generate(prompt).await?),
            LlmProviderInner::OpenAI(llm) => Ok(llm.generate(prompt).await?),
            LlmProviderInner::Command(llm) => llm.generate(prompt).await,
        }
    }

    /// Get model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl CompletionProvider for LlmProvider {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError> {
        let output = tokio::time::timeout(timeout, self.generate(prompt))
            .await
            .map_err(|_| GenerationError::Timeout(timeout))??;
        Ok(output.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_config() {
        let config = GenerationConfig::default();
        assert!(matches!(
            LlmType::from_config(&config).unwrap(),
            LlmType::Ollama { host: None }
        ));

        let config = GenerationConfig {
            provider: "command".to_string(),
            command: Some(vec!["ollama".into(), "run".into(), "mistral".into()]),
            ..Default::default()
        };
        match LlmType::from_config(&config).unwrap() {
            LlmType::Command { program, args } => {
                assert_eq!(program, "ollama");
                assert_eq!(args, vec!["run", "mistral"]);
            }
            other => panic!("unexpected type: {other:?}"),
        }
    }

    #[test]
    fn test_type_from_config_errors() {
        let config = GenerationConfig {
            provider: "command".to_string(),
            ..Default::default()
        };
        assert!(LlmType::from_config(&config).is_err());

        let config = GenerationConfig {
            provider: "anthropic".to_string(),
            ..Default::default()
        };
        assert!(LlmType::from_config(&config).is_err());
    }

    #[cfg(unix)]
    fn command_provider(script: &str) -> LlmProvider {
        LlmProvider::new(
            "sh".to_string(),
            LlmType::Command {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
            },
        )
        .unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_complete_trims_output() {
        let llm = command_provider("printf '  YES\\n\\n'");
        assert_eq!(llm.model_name(), "sh");
        let out = llm.complete("prompt", Duration::from_secs(10)).await.unwrap();
        assert_eq!(out, "YES");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_complete_times_out() {
        let llm = command_provider("sleep 5");
        let err = llm
            .complete("prompt", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout(d) if d == Duration::from_millis(100)));
    }
}
