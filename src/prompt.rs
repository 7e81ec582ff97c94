//! Prompt builder - generation and verification prompts over retrieved context

use crate::config::PromptConfig;
use crate::retriever::RetrievedPassage;

/// The only refusal the system ever returns
pub const FALLBACK_TEXT: &str =
    "Sorry, I cannot answer that from the provided document. Would you like to contact support?";

const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "greetings",
    "good morning",
    "good afternoon",
    "good evening",
    "hey",
    "how are you doing",
    "yo",
    "are you fine",
    "howdy",
    "what's up",
];

const GREETING_NOTE: &str = "The user greeted you. First reply with a warm and short greeting (like 'Hi there!'), then continue answering the question using the context below.";

/// Case-insensitive substring match against the greeting list.
///
/// Substring matching is loose on purpose: "this" contains "hi".
pub fn is_greeting(text: &str) -> bool {
    let lower = text.to_lowercase();
    GREETINGS.iter().any(|g| lower.contains(g))
}

/// Render passages as `[line_no] text`, one per line, in retrieval order
fn render_context(retrieved: &[RetrievedPassage]) -> String {
    retrieved
        .iter()
        .map(|p| format!("[{}] {}", p.line_no, p.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders both prompts; the wording around persona and homepage is fixed
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
    homepage: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

impl PromptBuilder {
    pub fn from_config(config: &PromptConfig) -> Self {
        Self {
            persona: config.persona.clone(),
            homepage: config.homepage.clone(),
        }
    }

    pub fn build_generation_prompt(&self, query: &str, retrieved: &[RetrievedPassage]) -> String {
        if retrieved.is_empty() {
            return format!(
                "User question: {}\n\nThis question cannot be answered from the provided knowledge base. Reply exactly: \"{}\"",
                query, FALLBACK_TEXT
            );
        }

        let greeting_note = if is_greeting(query) { GREETING_NOTE } else { "" };

        format!(
            r#"
You are a professional {persona}. Follow these rules strictly:
{greeting_note}
1) Use ONLY the information in the CONTEXT block below. Do NOT invent facts.
2) If the CONTEXT does NOT contain the answer, respond exactly:
   "{fallback}"
3) Provide step-by-step actionable directions that start from the {homepage}.
4) When referencing context, cite the line numbers in square brackets (e.g., [23]).
5) Be concise, professional, and polite.


CONTEXT:
{context}

User Question:
{query}

Answer:
"#,
            persona = self.persona,
            greeting_note = greeting_note,
            fallback = FALLBACK_TEXT,
            homepage = self.homepage,
            context = render_context(retrieved),
            query = query,
        )
        .trim()
        .to_string()
    }

    pub fn build_verification_prompt(
        &self,
        query: &str,
        retrieved: &[RetrievedPassage],
        answer: &str,
    ) -> String {
        format!(
            r#"
CONTEXT:
{context}

User Question:
{query}

Proposed Answer:
{answer}

Task:
Based only on the CONTEXT above, does the Proposed Answer rely ONLY on the provided CONTEXT (no external facts or assumptions)?
Answer with a single word: YES or NO.
"#,
            context = render_context(retrieved),
            query = query,
            answer = answer,
        )
        .trim()
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passages() -> Vec<RetrievedPassage> {
        vec![
            RetrievedPassage {
                line_no: 2,
                text: "Click Track Package.".to_string(),
                score: 0.75,
            },
            RetrievedPassage {
                line_no: 1,
                text: "Go to Orders.".to_string(),
                score: 0.25,
            },
        ]
    }

    #[test]
    fn test_greeting_detection() {
        assert!(is_greeting("Hello there"));
        assert!(is_greeting("GOOD MORNING, where is my parcel?"));
        assert!(is_greeting("what's up"));
        assert!(is_greeting("this")); // contains "hi"
        assert!(!is_greeting("Track my order"));
        assert!(!is_greeting(""));
    }

    #[test]
    fn test_generation_prompt_wording() {
        let prompt = PromptBuilder::default().build_generation_prompt("Where is my order?", &passages());
        let expected = "You are a professional Amazon Help Assistant. Follow these rules strictly:\n\
\n\
1) Use ONLY the information in the CONTEXT block below. Do NOT invent facts.\n\
2) If the CONTEXT does NOT contain the answer, respond exactly:\n   \
\"Sorry, I cannot answer that from the provided document. Would you like to contact support?\"\n\
3) Provide step-by-step actionable directions that start from the Amazon homepage.\n\
4) When referencing context, cite the line numbers in square brackets (e.g., [23]).\n\
5) Be concise, professional, and polite.\n\
\n\
\n\
CONTEXT:\n\
[2] Click Track Package.\n\
[1] Go to Orders.\n\
\n\
User Question:\n\
Where is my order?\n\
\n\
Answer:";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_generation_prompt_greeting() {
        let prompt = PromptBuilder::default().build_generation_prompt("Hello, where is my order?", &passages());
        assert!(prompt.contains(&format!("strictly:\n{}\n1) Use ONLY", GREETING_NOTE)));
    }

    #[test]
    fn test_generation_prompt_without_context() {
        let prompt = PromptBuilder::default().build_generation_prompt("What is the capital of France?", &[]);
        assert_eq!(
            prompt,
            format!(
                "User question: What is the capital of France?\n\nThis question cannot be answered from the provided knowledge base. Reply exactly: \"{}\"",
                FALLBACK_TEXT
            )
        );
    }

    #[test]
    fn test_custom_persona() {
        let builder = PromptBuilder::from_config(&PromptConfig {
            persona: "Store Assistant".to_string(),
            homepage: "store dashboard".to_string(),
        });
        let prompt = builder.build_generation_prompt("Where is my order?", &passages());
        assert!(prompt.starts_with("You are a professional Store Assistant."));
        assert!(prompt.contains("start from the store dashboard."));
    }

    #[test]
    fn test_verification_prompt_wording() {
        let prompt = PromptBuilder::default().build_verification_prompt(
            "Where is my order?",
            &passages(),
            "Go to Orders, then click Track Package [2].",
        );
        let expected = "CONTEXT:\n\
[2] Click Track Package.\n\
[1] Go to Orders.\n\
\n\
User Question:\n\
Where is my order?\n\
\n\
Proposed Answer:\n\
Go to Orders, then click Track Package [2].\n\
\n\
Task:\n\
Based only on the CONTEXT above, does the Proposed Answer rely ONLY on the provided CONTEXT (no external facts or assumptions)?\n\
Answer with a single word: YES or NO.";
        assert_eq!(prompt, expected);
    }
}
