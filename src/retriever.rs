//! Retriever - query embedding, nearest-neighbor search and OOD classification

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::embedding::{normalize, Embedder};
use crate::error::{RagError, RagResult};
use crate::index::LoadedIndex;

/// One passage returned for a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub line_no: usize,
    pub text: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Retrieval result plus the in/out-of-distribution call derived from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    /// Sorted by descending score
    pub passages: Vec<RetrievedPassage>,
    /// `max_score < threshold`
    pub is_ood: bool,
    /// Highest score among `passages`, 0.0 when empty
    pub max_score: f32,
}

impl Retrieval {
    /// Classify a scored candidate list against `threshold`
    pub fn classify(passages: Vec<RetrievedPassage>, threshold: f32) -> Self {
        let max_score = passages
            .iter()
            .map(|p| p.score)
            .fold(None, |best: Option<f32>, s| Some(best.map_or(s, |b| b.max(s))))
            .unwrap_or(0.0);

        Self {
            passages,
            is_ood: max_score < threshold,
            max_score,
        }
    }
}

/// Read-only searcher over a loaded index; safe to share across requests
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<LoadedIndex>,
}

impl Retriever {
    /// Pair an embedder with an index, refusing a dimension mismatch
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<LoadedIndex>) -> RagResult<Self> {
        if embedder.dimensions() != index.dimensions() {
            return Err(RagError::DimensionMismatch {
                expected: index.dimensions(),
                actual: embedder.dimensions(),
            });
        }
        Ok(Self { embedder, index })
    }

    pub fn index(&self) -> &LoadedIndex {
        &self.index
    }

    /// Retrieve up to `top_k` passages for `query` and classify it
    pub async fn search(&self, query: &str, top_k: usize, threshold: f32) -> RagResult<Retrieval> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let mut vectors = self.embedder.embed(&[query]).await?;
        let mut query_vector = vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("embedder returned no vector for the query".into()))?;

        if query_vector.len() != self.index.dimensions() {
            return Err(RagError::DimensionMismatch {
                expected: self.index.dimensions(),
                actual: query_vector.len(),
            });
        }
        normalize(&mut query_vector);

        let (positions, scores) = if top_k == 0 || self.index.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            self.index.search(&query_vector, top_k)?
        };

        let passages: Vec<RetrievedPassage> = positions
            .iter()
            .zip(scores.iter())
            .filter_map(|(position, score)| {
                // Positions outside the passage list are "no match" padding
                self.index.passage(*position).map(|p| RetrievedPassage {
                    line_no: p.line_no,
                    text: p.text.clone(),
                    score: score.clamp(-1.0, 1.0),
                })
            })
            .collect();

        let retrieval = Retrieval::classify(passages, threshold);

        debug!(
            "query={:?} top_k={} retrieved={} max_score={:.4} is_ood={}",
            query,
            top_k,
            retrieval.passages.len(),
            retrieval.max_score,
            retrieval.is_ood
        );

        Ok(retrieval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scenario_embedder, scenario_index, FakeEmbedder};

    fn scenario_retriever() -> Retriever {
        Retriever::new(Arc::new(scenario_embedder()), Arc::new(scenario_index())).unwrap()
    }

    #[tokio::test]
    async fn test_in_distribution_query() {
        let retriever = scenario_retriever();
        let retrieval = retriever.search("How do I track my order?", 5, 0.20).await.unwrap();

        assert!(!retrieval.is_ood);
        assert!((retrieval.max_score - 0.75).abs() < 1e-5);
        assert_eq!(retrieval.passages[0].line_no, 2);
        assert_eq!(retrieval.passages[0].text, "Click Track Package.");
        // Only three passages exist even though five were requested
        assert_eq!(retrieval.passages.len(), 3);
    }

    #[tokio::test]
    async fn test_out_of_distribution_query() {
        let retriever = scenario_retriever();
        let retrieval = retriever
            .search("What is the capital of France?", 5, 0.20)
            .await
            .unwrap();

        assert!(retrieval.is_ood);
        assert!((retrieval.max_score - 0.05).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_scores_sorted_and_bounded() {
        let retriever = scenario_retriever();
        for query in ["How do I track my order?", "What is the capital of France?", "anything else"] {
            let retrieval = retriever.search(query, 3, 0.20).await.unwrap();
            assert!(retrieval
                .passages
                .iter()
                .all(|p| (-1.0..=1.0).contains(&p.score)));
            assert!(retrieval.passages.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[tokio::test]
    async fn test_search_is_idempotent() {
        let retriever = scenario_retriever();
        let first = retriever.search("How do I track my order?", 2, 0.20).await.unwrap();
        let second = retriever.search("How do I track my order?", 2, 0.20).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.passages.len(), 2);
    }

    #[tokio::test]
    async fn test_threshold_boundary() {
        let retriever = scenario_retriever();
        let below = retriever.search("How do I track my order?", 5, 0.74).await.unwrap();
        assert!(!below.is_ood);
        let above = retriever.search("How do I track my order?", 5, 0.76).await.unwrap();
        assert!(above.is_ood);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let retriever = scenario_retriever();
        assert!(matches!(
            retriever.search("   ", 5, 0.2).await,
            Err(RagError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn test_empty_query_skips_embedder() {
        let embedder = Arc::new(scenario_embedder());
        let retriever = Retriever::new(embedder.clone(), Arc::new(scenario_index())).unwrap();

        assert!(retriever.search("", 5, 0.2).await.is_err());
        assert_eq!(embedder.calls(), 0);

        retriever.search("How do I track my order?", 5, 0.2).await.unwrap();
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_top_k_is_ood() {
        let retriever = scenario_retriever();
        let retrieval = retriever.search("How do I track my order?", 0, 0.20).await.unwrap();
        assert!(retrieval.passages.is_empty());
        assert_eq!(retrieval.max_score, 0.0);
        assert!(retrieval.is_ood);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let result = Retriever::new(Arc::new(FakeEmbedder::new(7)), Arc::new(scenario_index()));
        assert!(matches!(result, Err(RagError::DimensionMismatch { expected: 4, actual: 7 })));
    }

    #[test]
    fn test_classify_empty() {
        let retrieval = Retrieval::classify(Vec::new(), 0.2);
        assert_eq!(retrieval.max_score, 0.0);
        assert!(retrieval.is_ood);

        // A negative threshold lets an empty result through
        assert!(!Retrieval::classify(Vec::new(), -0.5).is_ood);
    }
}
