//! Orchestrator - retrieve, generate, verify and fall back

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{RagError, RagResult};
use crate::llm::CompletionProvider;
use crate::prompt::{PromptBuilder, FALLBACK_TEXT};
use crate::retriever::{Retrieval, RetrievedPassage, Retriever};

/// Outcome of the verification call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The backend confirmed the answer relies only on the context
    Grounded,
    /// The backend said anything other than YES
    Rejected,
    /// No context to verify against, or the verification call failed
    Unavailable,
}

impl Verdict {
    /// `YES` anywhere in the trimmed, uppercased output counts as grounded
    pub fn parse(output: &str) -> Self {
        if output.trim().to_uppercase().contains("YES") {
            Verdict::Grounded
        } else {
            Verdict::Rejected
        }
    }
}

/// Final answer for one query
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub verified: bool,
    pub is_ood: bool,
    pub retrieval: Retrieval,
}

impl Answer {
    fn fallback(retrieval: Retrieval) -> Self {
        Self {
            text: FALLBACK_TEXT.to_string(),
            verified: false,
            is_ood: retrieval.is_ood,
            retrieval,
        }
    }
}

/// Wire shape of an answer
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub is_ood: bool,
    pub verified: bool,
    pub max_score: f32,
    pub retrieved: Vec<RetrievedPassage>,
}

impl From<Answer> for AskResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.text,
            is_ood: answer.is_ood,
            verified: answer.verified,
            max_score: answer.retrieval.max_score,
            retrieved: answer.retrieval.passages,
        }
    }
}

/// Immutable per-process query pipeline
pub struct Pipeline {
    retriever: Retriever,
    llm: Arc<dyn CompletionProvider>,
    prompts: PromptBuilder,
    top_k: usize,
    threshold: f32,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(retriever: Retriever, llm: Arc<dyn CompletionProvider>, config: &Config) -> Self {
        Self {
            retriever,
            llm,
            prompts: PromptBuilder::from_config(&config.prompt),
            top_k: config.retrieval.top_k,
            threshold: config.retrieval.threshold,
            timeout: config.generation.timeout(),
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Retrieval and classification only, no generation
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> RagResult<Retrieval> {
        self.retriever
            .search(query, top_k.unwrap_or(self.top_k), self.threshold)
            .await
    }

    /// Answer `query` from the indexed corpus or return the fallback.
    ///
    /// Only generation failures propagate; a failed verification call
    /// degrades to the fallback answer.
    pub async fn answer(&self, query: &str) -> RagResult<Answer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let retrieval = self.retriever.search(query, self.top_k, self.threshold).await?;
        if retrieval.is_ood {
            info!(
                "Out of distribution (max_score={:.4} < {:.2}), returning fallback",
                retrieval.max_score, self.threshold
            );
            return Ok(Answer::fallback(retrieval));
        }

        let prompt = self.prompts.build_generation_prompt(query, &retrieval.passages);
        let generated = self.llm.complete(&prompt, self.timeout).await?;
        debug!("Generated answer: {:?}", generated);

        match self.verify(query, &retrieval.passages, &generated).await {
            Verdict::Grounded => Ok(Answer {
                text: generated,
                verified: true,
                is_ood: false,
                retrieval,
            }),
            Verdict::Rejected => {
                info!("Verification rejected the generated answer, returning fallback");
                Ok(Answer::fallback(retrieval))
            }
            Verdict::Unavailable => Ok(Answer::fallback(retrieval)),
        }
    }

    async fn verify(&self, query: &str, retrieved: &[RetrievedPassage], answer: &str) -> Verdict {
        if retrieved.is_empty() {
            return Verdict::Unavailable;
        }

        let prompt = self.prompts.build_verification_prompt(query, retrieved, answer);
        match self.llm.complete(&prompt, self.timeout).await {
            Ok(output) => {
                debug!("Verification output: {:?}", output);
                Verdict::parse(&output)
            }
            Err(e) => {
                warn!("Verification call failed, returning fallback: {}", e);
                Verdict::Unavailable
            }
        }
    }
}
