//! Error taxonomy for the retrieval-verify-fallback pipeline
//!
//! Startup and integrity errors (`ModelLoad`, `IndexNotFound`, `IndexCorrupt`,
//! `DimensionMismatch`, `EmptyCorpus`) abort the process. `EmptyQuery` and
//! `Generation` are per-request failures surfaced to the caller. Verification
//! failures never appear here: they resolve to the fallback answer.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the core pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// The embedding backend could not be initialized
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    /// No prior build exists at the index location
    #[error("no index found at {}; run 'grounded ingest' first", .0.display())]
    IndexNotFound(PathBuf),

    /// Index artifacts exist but are incomplete or inconsistent
    #[error("index at {} is corrupt: {reason}", path.display())]
    IndexCorrupt { path: PathBuf, reason: String },

    /// The corpus contained no non-blank lines
    #[error("corpus is empty: no non-blank lines to ingest")]
    EmptyCorpus,

    /// Stored vectors and the embedder disagree on dimension
    #[error("embedding dimension mismatch: index has {expected}, embedder produced {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The query was blank after trimming
    #[error("empty query")]
    EmptyQuery,

    /// The generation backend failed while producing an answer
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Computing embeddings failed after the model was loaded
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Vector index library error
    #[error("vector backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// Whether the error is the caller's fault rather than a server-side failure
    pub fn is_client_error(&self) -> bool {
        matches!(self, RagError::EmptyQuery)
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        RagError::IndexCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failures of a single completion call
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("completion timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("backend exited with code {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("failed to start backend process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("{0}")]
    Transport(String),
}

impl From<anyhow::Error> for GenerationError {
    fn from(err: anyhow::Error) -> Self {
        GenerationError::Transport(format!("{:#}", err))
    }
}

/// Convenience alias for core results
pub type RagResult<T> = Result<T, RagError>;
