//! Index store - full rebuilds and validated loads of the on-disk index
//!
//! A build writes four files into a staging directory next to the target and
//! only then swaps it in, so readers never observe a half-written index:
//!
//! - `passages.index`: the backend structure over L2-normalized vectors
//! - `passages.embeddings`: the raw embedding matrix, row i = passage i
//! - `passages.jsonl`: passage metadata in ingestion order
//! - `meta.json`: manifest tying the three together

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backend::{BackendSearcher, BackendType};
use crate::embedding::{normalize, Embedder};
use crate::error::{RagError, RagResult};

use super::embeddings::{write_matrix, EmbeddingsStore};
use super::meta::{IndexMeta, META_VERSION};
use super::passages::{read_passages, write_passages, Passage};

pub const INDEX_FILE: &str = "passages.index";
pub const EMBEDDINGS_FILE: &str = "passages.embeddings";
pub const PASSAGES_FILE: &str = "passages.jsonl";
pub const META_FILE: &str = "meta.json";

const ARTIFACTS: [&str; 3] = [INDEX_FILE, EMBEDDINGS_FILE, PASSAGES_FILE];

/// Location and backend of one index build
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
    backend: BackendType,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>, backend: BackendType) -> Self {
        Self {
            dir: dir.into(),
            backend,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a manifest exists at this location
    pub fn exists(&self) -> bool {
        self.dir.join(META_FILE).exists()
    }

    /// Embed `passages` and replace whatever index lives at this location
    ///
    /// Blank passages are dropped and the rest renumbered from 1, so the
    /// stored `line_no` values are always contiguous.
    pub async fn build(&self, passages: &[Passage], embedder: &dyn Embedder) -> RagResult<IndexMeta> {
        let passages = Passage::from_lines(passages.iter().map(|p| p.text.as_str()));
        if passages.is_empty() {
            return Err(RagError::EmptyCorpus);
        }
        self.check_replaceable()?;

        let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        info!("Encoding {} passages with {}", texts.len(), embedder.model_name());

        let raw = embedder.embed(&texts).await?;
        if raw.len() != passages.len() {
            return Err(RagError::Embedding(format!(
                "embedder returned {} vectors for {} passages",
                raw.len(),
                passages.len()
            )));
        }

        let dimensions = embedder.dimensions();
        if let Some(bad) = raw.iter().find(|v| v.len() != dimensions) {
            return Err(RagError::DimensionMismatch {
                expected: dimensions,
                actual: bad.len(),
            });
        }

        let normalized: Vec<Vec<f32>> = raw
            .iter()
            .map(|v| {
                let mut v = v.clone();
                normalize(&mut v);
                v
            })
            .collect();

        let meta = IndexMeta {
            version: META_VERSION.to_string(),
            backend_name: self.backend.name().to_string(),
            embedding_model: embedder.model_name().to_string(),
            dimensions,
            passage_count: passages.len(),
        };

        let staging = self.sibling("staging")?;
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        write_passages(&staging.join(PASSAGES_FILE), &passages)?;
        write_matrix(&staging.join(EMBEDDINGS_FILE), dimensions, &raw)?;
        self.backend
            .build(&normalized, &staging.join(INDEX_FILE), dimensions)?;
        meta.save(&staging.join(META_FILE))?;

        self.swap_in(&staging)?;

        info!(
            "Index built at {:?}: {} passages, {} dims, {} backend",
            self.dir, meta.passage_count, meta.dimensions, meta.backend_name
        );
        Ok(meta)
    }

    /// Load and cross-check every artifact of the current build
    pub fn load(&self) -> RagResult<LoadedIndex> {
        let meta_path = self.dir.join(META_FILE);

        if !meta_path.exists() {
            if let Some(present) = ARTIFACTS.iter().find(|f| self.dir.join(f).exists()) {
                return Err(RagError::corrupt(
                    &self.dir,
                    format!("{} present but {} missing", present, META_FILE),
                ));
            }
            return Err(RagError::IndexNotFound(self.dir.clone()));
        }

        let meta = IndexMeta::load(&meta_path)
            .map_err(|e| RagError::corrupt(&meta_path, e.to_string()))?;

        if let Some(missing) = ARTIFACTS.iter().find(|f| !self.dir.join(f).exists()) {
            return Err(RagError::corrupt(&self.dir, format!("{} missing", missing)));
        }
        if meta.version != META_VERSION {
            return Err(RagError::corrupt(
                &meta_path,
                format!("unsupported manifest version {}", meta.version),
            ));
        }

        let backend: BackendType = meta
            .backend_name
            .parse()
            .map_err(|e: anyhow::Error| RagError::corrupt(&meta_path, e.to_string()))?;

        let passages = read_passages(&self.dir.join(PASSAGES_FILE))?;
        self.check_count(PASSAGES_FILE, passages.len(), meta.passage_count)?;

        let raw = EmbeddingsStore::open(&self.dir.join(EMBEDDINGS_FILE), meta.dimensions)?;
        self.check_count(EMBEDDINGS_FILE, raw.len(), meta.passage_count)?;

        let searcher = backend.load_searcher(&self.dir.join(INDEX_FILE), meta.dimensions)?;
        self.check_count(INDEX_FILE, searcher.len(), meta.passage_count)?;

        info!(
            "Loaded index from {:?} ({} passages, {} dims)",
            self.dir, meta.passage_count, meta.dimensions
        );

        Ok(LoadedIndex::from_parts(meta, passages, searcher))
    }

    /// Only a missing or empty directory, or a previous build, may be replaced
    fn check_replaceable(&self) -> RagResult<()> {
        if !self.dir.exists() || self.exists() {
            return Ok(());
        }
        let occupied = !self.dir.is_dir() || std::fs::read_dir(&self.dir)?.next().is_some();
        if occupied {
            return Err(RagError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!(
                    "{} exists and is not an index (no {}); refusing to replace it",
                    self.dir.display(),
                    META_FILE
                ),
            )));
        }
        Ok(())
    }

    fn check_count(&self, artifact: &str, found: usize, expected: usize) -> RagResult<()> {
        if found != expected {
            return Err(RagError::corrupt(
                &self.dir,
                format!("{} holds {} entries, manifest says {}", artifact, found, expected),
            ));
        }
        Ok(())
    }

    /// Path next to the index directory, e.g. `index.staging`
    fn sibling(&self, suffix: &str) -> RagResult<PathBuf> {
        let name = self.dir.file_name().ok_or_else(|| {
            RagError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("index location {:?} has no directory name", self.dir),
            ))
        })?;
        let mut sibling = name.to_os_string();
        sibling.push(".");
        sibling.push(suffix);
        Ok(self.dir.with_file_name(sibling))
    }

    fn swap_in(&self, staging: &Path) -> RagResult<()> {
        let previous = self.sibling("previous")?;
        if previous.exists() {
            std::fs::remove_dir_all(&previous)?;
        }

        if self.dir.exists() {
            debug!("Moving previous build aside to {:?}", previous);
            std::fs::rename(&self.dir, &previous)?;
        }

        if let Err(e) = std::fs::rename(staging, &self.dir) {
            if previous.exists() {
                // Put the old build back so serving can still start
                if let Err(restore) = std::fs::rename(&previous, &self.dir) {
                    warn!(
                        "Failed to restore previous build, it remains at {:?}: {}",
                        previous, restore
                    );
                }
            }
            return Err(e.into());
        }

        if previous.exists() {
            std::fs::remove_dir_all(&previous)?;
        }
        Ok(())
    }
}

/// An index loaded for serving; immutable for the life of the process
pub struct LoadedIndex {
    meta: IndexMeta,
    passages: Vec<Passage>,
    searcher: Box<dyn BackendSearcher>,
}

impl LoadedIndex {
    pub fn from_parts(meta: IndexMeta, passages: Vec<Passage>, searcher: Box<dyn BackendSearcher>) -> Self {
        Self {
            meta,
            passages,
            searcher,
        }
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn dimensions(&self) -> usize {
        self.meta.dimensions
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    #[cfg(test)]
    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    /// Passage at an ingestion-order position, `None` for out-of-range sentinels
    pub fn passage(&self, position: u64) -> Option<&Passage> {
        usize::try_from(position).ok().and_then(|i| self.passages.get(i))
    }

    /// Nearest neighbors of a normalized query vector
    pub fn search(&self, query: &[f32], top_k: usize) -> RagResult<(Vec<u64>, Vec<f32>)> {
        self.searcher.search(query, top_k)
    }
}
