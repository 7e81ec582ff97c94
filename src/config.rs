//! Configuration file support
//!
//! Config file location: ~/.config/grounded/config.toml
//! (override with `--config <path>` or `GROUNDED_CONFIG`)
//!
//! Example config:
//! ```toml
//! [embedding]
//! provider = "ollama"  # ollama, openai, local
//! model = "all-minilm"
//! # model_path = "/models/all-MiniLM-L6-v2"  # for local
//!
//! [index]
//! dir = ".grounded/index"
//! backend = "flat"
//!
//! [retrieval]
//! top_k = 5
//! threshold = 0.20
//!
//! [generation]
//! provider = "ollama"  # ollama, openai, command
//! model = "mistral"
//! timeout_secs = 60
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider type: ollama, openai, local
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Directory holding config.json, tokenizer.json and model.safetensors (local provider)
    pub model_path: Option<PathBuf>,

    /// Host for Ollama (e.g., http://localhost:11434)
    pub host: Option<String>,

    /// Base URL for OpenAI-compatible APIs (e.g., http://localhost:1234/v1)
    pub base_url: Option<String>,

    /// API key for OpenAI
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            model_path: None,
            host: None,
            base_url: None,
            api_key: None,
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

fn default_embedding_model() -> String {
    "all-minilm".to_string()
}

/// Index storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the index artifacts
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,

    /// Vector backend: flat (exact) or hnsw
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
            backend: default_backend(),
        }
    }
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(".grounded").join("index")
}

fn default_backend() -> String {
    "flat".to_string()
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of passages to retrieve
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum cosine similarity for a query to count as in-distribution
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            threshold: default_threshold(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_threshold() -> f32 {
    0.20
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Provider type: ollama, openai, command
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Host for Ollama
    pub host: Option<String>,

    /// Base URL for OpenAI-compatible APIs
    pub base_url: Option<String>,

    /// API key for OpenAI
    pub api_key: Option<String>,

    /// Program and arguments for the command provider; the prompt is written to stdin
    pub command: Option<Vec<String>>,

    /// Timeout for each completion call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            host: None,
            base_url: None,
            api_key: None,
            command: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}

fn default_llm_model() -> String {
    "mistral".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Wording used by the prompt builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_persona")]
    pub persona: String,

    #[serde(default = "default_homepage")]
    pub homepage: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            homepage: default_homepage(),
        }
    }
}

fn default_persona() -> String {
    "Amazon Help Assistant".to_string()
}

fn default_homepage() -> String {
    "Amazon homepage".to_string()
}

impl Config {
    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grounded")
            .join("config.toml")
    }

    /// Load config from the default location, returning defaults if not found
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match Self::load_from(&path) {
                Ok(config) => {
                    tracing::debug!("Loaded config from {:?}", path);
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file: {:#}", e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path; unlike [`Config::load`] this fails loudly
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honor
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.retrieval.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be greater than 0");
        }
        if !(-1.0..=1.0).contains(&self.retrieval.threshold) {
            anyhow::bail!(
                "retrieval.threshold must be a cosine similarity in [-1, 1], got {}",
                self.retrieval.threshold
            );
        }
        if self.generation.timeout_secs == 0 {
            anyhow::bail!("generation.timeout_secs must be greater than 0");
        }
        if self.generation.provider == "command"
            && self.generation.command.as_ref().map_or(false, |c| c.is_empty())
        {
            anyhow::bail!("generation.command must name a program");
        }
        Ok(())
    }

    /// Write the annotated example config, overwriting only when `force` is set
    pub fn write_example(path: &Path, force: bool) -> anyhow::Result<bool> {
        if path.exists() && !force {
            return Ok(false);
        }

        let example = r#"# grounded configuration
# Location: ~/.config/grounded/config.toml

[embedding]
# Provider: ollama, openai, local
provider = "ollama"

# Model name (provider-specific)
# Ollama: all-minilm, nomic-embed-text, mxbai-embed-large
# OpenAI: text-embedding-3-small, text-embedding-3-large
model = "all-minilm"

# Local sentence-transformers model directory (provider = "local")
# model_path = "/models/all-MiniLM-L6-v2"

# Ollama host (default: http://localhost:11434)
# host = "http://localhost:11434"

# OpenAI-compatible base URL and key (or set OPENAI_BASE_URL/OPENAI_API_KEY)
# base_url = "http://localhost:1234/v1"
# api_key = "sk-..."

[index]
# Directory holding passages.index, passages.embeddings, passages.jsonl and meta.json
dir = ".grounded/index"

# Backend: flat (exact inner product) or hnsw (approximate, for large corpora)
backend = "flat"

[retrieval]
# Passages retrieved per question
top_k = 5

# Queries whose best cosine similarity falls below this are out of distribution
threshold = 0.20

[generation]
# Provider: ollama, openai, command
provider = "ollama"
model = "mistral"

# Run a local program instead (provider = "command"); the prompt goes to stdin
# command = ["ollama", "run", "mistral"]

# Seconds before a completion call is abandoned
timeout_secs = 60

[prompt]
persona = "Amazon Help Assistant"
homepage = "Amazon homepage"
"#;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, example)?;
        Ok(true)
    }
}
