//! LLM integration
//!
//! Provides traits and implementations for:
//! - Chat completion and embedding generation via external services
//! - Search intent extraction from user queries and survey answers
//! - Candidate reranking with recommendation reasons
//! - Clarifying-question generation for the shopping research flow

mod cache;
mod client;
mod intent;
mod questions;
mod rerank;

pub use cache::{chat_cache_key, embedding_cache_key, TtlCache};
pub use client::{ChatMessage, LlmClient, OpenAiClient};
pub use intent::{IntentExtractor, SearchIntent};
pub use questions::{default_questions, QuestionGenerator, ResearchQuestion};
pub use rerank::{fallback_selections, RerankCandidate, RerankSelection, Reranker};

/// Extract the first `{...}` JSON object from LLM output.
///
/// Models frequently wrap JSON in prose or markdown fences; everything before
/// the first opening brace and after the last closing brace is discarded.
/// Returns `None` when no brace pair exists.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object_plain() {
        assert_eq!(extract_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_extract_json_object_with_prose() {
        let response = "Sure! Here is the JSON:\n```json\n{\"a\": 1}\n```\nHope that helps.";
        assert_eq!(extract_json_object(response), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_extract_json_object_missing() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }
}
