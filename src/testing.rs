//! Test doubles for the embedder and the completion backend

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::FlatSearcher;
use crate::embedding::Embedder;
use crate::error::{GenerationError, RagResult};
use crate::index::{IndexMeta, LoadedIndex, Passage};
use crate::llm::CompletionProvider;

/// Embedder with a lookup table and a byte-hash fallback for unknown text
pub struct FakeEmbedder {
    dimensions: usize,
    table: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            table: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hashed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dimensions];
        for (i, b) in text.bytes().enumerate() {
            v[i % self.dimensions] += (b as f32 + 1.0) / 256.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-embedder"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| self.table.get(*t).cloned().unwrap_or_else(|| self.hashed(t)))
            .collect())
    }
}

/// Completion backend that replays canned responses in order
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str, _timeout: Duration) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Transport("no scripted response left".into())))
    }
}

pub const SCENARIO_CORPUS: [&str; 3] = ["Go to Orders.", "Click Track Package.", "Enter your order ID."];

/// Embeddings giving "How do I track my order?" a best score of 0.75 (line 2)
/// and "What is the capital of France?" a best score of 0.05
pub fn scenario_embedder() -> FakeEmbedder {
    FakeEmbedder::new(4)
        .with(SCENARIO_CORPUS[0], vec![1.0, 0.0, 0.0, 0.0])
        .with(SCENARIO_CORPUS[1], vec![0.0, 1.0, 0.0, 0.0])
        .with(SCENARIO_CORPUS[2], vec![0.0, 0.0, 1.0, 0.0])
        .with("How do I track my order?", vec![0.25, 0.75, 0.0, 0.375f32.sqrt()])
        .with(
            "What is the capital of France?",
            vec![0.05, 0.03, 0.02, (1.0f32 - 0.0025 - 0.0009 - 0.0004).sqrt()],
        )
}

/// The three-line corpus indexed in memory with the flat backend
pub fn scenario_index() -> LoadedIndex {
    let passages = Passage::from_lines(SCENARIO_CORPUS);
    let rows = vec![
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0, 0.0],
        vec![0.0, 0.0, 1.0, 0.0],
    ];
    let meta = IndexMeta {
        version: "1".to_string(),
        backend_name: "flat".to_string(),
        embedding_model: "fake-embedder".to_string(),
        dimensions: 4,
        passage_count: passages.len(),
    };
    let searcher = FlatSearcher::from_rows(&rows, 4).expect("scenario rows are 4-dimensional");
    LoadedIndex::from_parts(meta, passages, Box::new(searcher))
}
