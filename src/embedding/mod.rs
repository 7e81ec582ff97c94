//! Embedding module - compute embeddings from text
//!
//! The embedding model is the most expensive thing the process loads, so it is
//! initialized once and shared: [`shared`] hands out the process-wide
//! [`SharedEmbedder`], whose first `get()` loads the model while concurrent
//! callers wait for the same load.

mod openai;
mod ollama;
mod traits;

#[cfg(feature = "local-embeddings")]
mod candle;

pub use traits::Embedder;

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::EmbeddingConfig;
use crate::error::{RagError, RagResult};

/// Embedding mode configuration
#[derive(Debug, Clone)]
pub enum EmbeddingMode {
    OpenAI {
        api_key: Option<String>,
        base_url: Option<String>,
    },
    Ollama {
        host: Option<String>,
    },
    Local {
        model_path: PathBuf,
    },
}

impl EmbeddingMode {
    /// Resolve the mode named by an `[embedding]` config section
    pub fn from_config(config: &EmbeddingConfig) -> RagResult<Self> {
        match config.provider.as_str() {
            "openai" => Ok(EmbeddingMode::OpenAI {
                api_key: config.api_key.clone(),
                base_url: config.base_url.clone(),
            }),
            "ollama" => Ok(EmbeddingMode::Ollama {
                host: config.host.clone(),
            }),
            "local" => {
                let model_path = config.model_path.clone().ok_or_else(|| {
                    RagError::ModelLoad("embedding.model_path is required for the local provider".into())
                })?;
                Ok(EmbeddingMode::Local { model_path })
            }
            other => Err(RagError::ModelLoad(format!(
                "unknown embedding provider: {}",
                other
            ))),
        }
    }

    /// Short name recorded in the index manifest
    pub fn name(&self) -> &'static str {
        match self {
            EmbeddingMode::OpenAI { .. } => "openai",
            EmbeddingMode::Ollama { .. } => "ollama",
            EmbeddingMode::Local { .. } => "local",
        }
    }
}

/// Unified embedding provider
pub struct EmbeddingProvider {
    model_name: String,
    mode_name: &'static str,
    dimensions: usize,
    inner: EmbeddingProviderInner,
}

enum EmbeddingProviderInner {
    OpenAI(openai::OpenAIEmbedding),
    Ollama(ollama::OllamaEmbedding),
    #[cfg(feature = "local-embeddings")]
    Local(Arc<candle::CandleEmbedding>),
}

impl EmbeddingProvider {
    /// Create a new embedding provider
    ///
    /// Remote providers are probed with one embedding so that an unreachable
    /// service or unknown model fails here, with the real output dimension
    /// recorded for later integrity checks.
    pub async fn new(model_name: String, mode: EmbeddingMode) -> RagResult<Self> {
        let mode_name = mode.name();
        let load_err = |e: anyhow::Error| RagError::ModelLoad(format!("{:#}", e));

        let inner = match mode {
            EmbeddingMode::OpenAI { api_key, base_url } => EmbeddingProviderInner::OpenAI(
                openai::OpenAIEmbedding::new(model_name.clone(), api_key, base_url)
                    .map_err(load_err)?,
            ),
            EmbeddingMode::Ollama { host } => EmbeddingProviderInner::Ollama(
                ollama::OllamaEmbedding::new(model_name.clone(), host).map_err(load_err)?,
            ),
            #[cfg(feature = "local-embeddings")]
            EmbeddingMode::Local { model_path } => {
                let model = tokio::task::spawn_blocking(move || {
                    candle::CandleEmbedding::load(&model_path)
                })
                .await
                .map_err(|e| RagError::ModelLoad(e.to_string()))?
                .map_err(load_err)?;
                EmbeddingProviderInner::Local(Arc::new(model))
            }
            #[cfg(not(feature = "local-embeddings"))]
            EmbeddingMode::Local { .. } => {
                return Err(RagError::ModelLoad(
                    "local embeddings not available. Rebuild with --features local-embeddings"
                        .into(),
                ));
            }
        };

        let mut provider = Self {
            model_name,
            mode_name,
            dimensions: 0,
            inner,
        };

        provider.dimensions = match &provider.inner {
            #[cfg(feature = "local-embeddings")]
            EmbeddingProviderInner::Local(model) => model.dimensions(),
            _ => {
                let probe = provider
                    .embed_raw(&["dimension probe"])
                    .await
                    .map_err(load_err)?;
                probe
                    .first()
                    .map(|v| v.len())
                    .filter(|d| *d > 0)
                    .ok_or_else(|| RagError::ModelLoad("provider returned an empty embedding".into()))?
            }
        };

        info!(
            "Initialized embedding provider: {} via {} ({} dims)",
            provider.model_name, provider.mode_name, provider.dimensions
        );

        Ok(provider)
    }

    async fn embed_raw(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        match &self.inner {
            EmbeddingProviderInner::OpenAI(p) => p.embed(texts).await,
            EmbeddingProviderInner::Ollama(p) => p.embed(texts).await,
            #[cfg(feature = "local-embeddings")]
            EmbeddingProviderInner::Local(p) => {
                let model = Arc::clone(p);
                let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
                tokio::task::spawn_blocking(move || {
                    let refs: Vec<&str> = owned.iter().map(|s| s.as_str()).collect();
                    model.embed(&refs)
                })
                .await?
            }
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        self.embed_raw(texts)
            .await
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))
    }
}

type Loader = Box<dyn Fn() -> BoxFuture<'static, RagResult<Arc<dyn Embedder>>> + Send + Sync>;

/// Lazily-initialized embedder that loads its model at most once
pub struct SharedEmbedder {
    cell: OnceCell<Arc<dyn Embedder>>,
    loader: Loader,
}

impl SharedEmbedder {
    /// Shared embedder backed by the configured provider
    pub fn new(config: EmbeddingConfig) -> Self {
        Self::with_loader(move || {
            let config = config.clone();
            async move {
                let mode = EmbeddingMode::from_config(&config)?;
                let provider = EmbeddingProvider::new(config.model.clone(), mode).await?;
                Ok(Arc::new(provider) as Arc<dyn Embedder>)
            }
            .boxed()
        })
    }

    /// Shared embedder with a custom loader
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, RagResult<Arc<dyn Embedder>>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            loader: Box::new(loader),
        }
    }

    /// Return the embedder, loading it on first use
    ///
    /// A failed load leaves the cell empty; callers treat `ModelLoad` as fatal.
    pub async fn get(&self) -> RagResult<Arc<dyn Embedder>> {
        self.cell
            .get_or_try_init(|| (self.loader)())
            .await
            .map(Arc::clone)
    }
}

static PROCESS_EMBEDDER: OnceLock<SharedEmbedder> = OnceLock::new();

/// The process-wide shared embedder; settings passed on the first call win
pub fn shared(config: &EmbeddingConfig) -> &'static SharedEmbedder {
    PROCESS_EMBEDDER.get_or_init(|| SharedEmbedder::new(config.clone()))
}

/// L2-normalize a vector in place so inner product equals cosine similarity
///
/// Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::testing::FakeEmbedder;

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mode_from_config() {
        let mut config = EmbeddingConfig::default();
        assert!(matches!(
            EmbeddingMode::from_config(&config),
            Ok(EmbeddingMode::Ollama { .. })
        ));

        config.provider = "local".to_string();
        assert!(matches!(
            EmbeddingMode::from_config(&config),
            Err(RagError::ModelLoad(_))
        ));

        config.model_path = Some(PathBuf::from("/models/minilm"));
        let mode = EmbeddingMode::from_config(&config).unwrap();
        assert_eq!(mode.name(), "local");

        config.provider = "word2vec".to_string();
        assert!(EmbeddingMode::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_shared_embedder_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let shared = Arc::new(SharedEmbedder::with_loader(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(Arc::new(FakeEmbedder::new(4)) as Arc<dyn Embedder>)
            }
            .boxed()
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = Arc::clone(&shared);
                tokio::spawn(async move { shared.get().await.map(|e| e.dimensions()) })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 4);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shared_embedder_surfaces_load_error() {
        let shared = SharedEmbedder::with_loader(|| {
            async { Err(RagError::ModelLoad("no such model".into())) }.boxed()
        });
        match shared.get().await {
            Err(RagError::ModelLoad(msg)) => assert!(msg.contains("no such model")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected load failure"),
        }
    }
}
