//! Clarifying-question generation for the shopping research flow

use super::{extract_json_object, ChatMessage, LlmClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A clarifying question with multiple-choice options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchQuestion {
    pub question_id: u32,
    pub question: String,
    pub options: Vec<String>,
}

/// Generates 3-5 clarifying questions for a user query.
///
/// Generation failure falls back to a fixed default set; the call itself
/// never fails.
pub struct QuestionGenerator {
    client: Arc<dyn LlmClient>,
}

impl QuestionGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub async fn generate(&self, user_query: &str) -> Vec<ResearchQuestion> {
        let prompt = build_question_prompt(user_query);

        let messages = vec![
            ChatMessage::system(
                "You are a shopping assistant preparing a short survey. Output ONLY JSON: \
                 {\"questions\": [{\"question_id\": N, \"question\": \"...\", \
                 \"options\": [\"...\"]}, ...]}",
            ),
            ChatMessage::user(prompt),
        ];

        match self.client.chat_completion(messages).await {
            Ok(response) => match parse_questions_response(&response) {
                Some(questions) if !questions.is_empty() => questions,
                _ => {
                    tracing::warn!("Question generation returned no questions. Using defaults.");
                    default_questions()
                }
            },
            Err(e) => {
                tracing::warn!("Question generation failed: {}. Using defaults.", e);
                default_questions()
            }
        }
    }
}

fn build_question_prompt(user_query: &str) -> String {
    format!(
        r#"A user wants product recommendations for: "{}"

Write 3-5 multiple-choice questions that clarify what matters most to them
(purpose, budget, key specs, portability, ...). Questions and options are in
Korean. Each question has 3-5 options.

Output only JSON:
{{"questions": [{{"question_id": 1, "question": "...", "options": ["...", "..."]}}]}}"#,
        user_query
    )
}

fn parse_questions_response(response: &str) -> Option<Vec<ResearchQuestion>> {
    let json_str = extract_json_object(response)?;
    let parsed: serde_json::Value = serde_json::from_str(json_str).ok()?;

    let questions = parsed["questions"].as_array()?;
    let mut result = Vec::new();

    for (i, q) in questions.iter().enumerate() {
        let question = q["question"].as_str()?.to_string();
        let options: Vec<String> = q["options"]
            .as_array()?
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect();
        if options.is_empty() {
            return None;
        }

        // Question ids are backfilled positionally when the model omits them
        let question_id = q["question_id"].as_u64().map(|v| v as u32).unwrap_or(i as u32 + 1);

        result.push(ResearchQuestion {
            question_id,
            question,
            options,
        });
    }

    Some(result)
}

/// Fixed question set used when AI generation fails
pub fn default_questions() -> Vec<ResearchQuestion> {
    vec![
        ResearchQuestion {
            question_id: 1,
            question: "주요 사용 목적은 무엇인가요?".to_string(),
            options: vec![
                "일반 업무".to_string(),
                "영상 편집".to_string(),
                "게임".to_string(),
                "개발".to_string(),
            ],
        },
        ResearchQuestion {
            question_id: 2,
            question: "생각하시는 예산 범위는?".to_string(),
            options: vec![
                "100만원 미만".to_string(),
                "100~150만원".to_string(),
                "150~200만원".to_string(),
                "200만원 이상".to_string(),
            ],
        },
        ResearchQuestion {
            question_id: 3,
            question: "디스플레이에서 가장 중요한 점은?".to_string(),
            options: vec![
                "해상도".to_string(),
                "색재현율".to_string(),
                "크기".to_string(),
                "주사율".to_string(),
            ],
        },
        ResearchQuestion {
            question_id: 4,
            question: "휴대성을 어느 정도 고려하시나요?".to_string(),
            options: vec![
                "매우 중요".to_string(),
                "보통".to_string(),
                "성능이 더 중요".to_string(),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_questions_with_ids() {
        let response = r#"{"questions": [
            {"question_id": 1, "question": "용도는?", "options": ["업무", "게임"]},
            {"question_id": 2, "question": "예산은?", "options": ["100만원", "200만원"]}
        ]}"#;

        let questions = parse_questions_response(response).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].question_id, 2);
    }

    #[test]
    fn test_parse_questions_backfills_missing_ids() {
        let response = r#"{"questions": [
            {"question": "용도는?", "options": ["업무", "게임"]},
            {"question": "예산은?", "options": ["100만원", "200만원"]}
        ]}"#;

        let questions = parse_questions_response(response).unwrap();
        assert_eq!(questions[0].question_id, 1);
        assert_eq!(questions[1].question_id, 2);
    }

    #[test]
    fn test_parse_rejects_question_without_options() {
        let response = r#"{"questions": [{"question": "용도는?", "options": []}]}"#;
        assert!(parse_questions_response(response).is_none());
    }

    #[test]
    fn test_default_questions_shape() {
        let questions = default_questions();
        assert!(questions.len() >= 3 && questions.len() <= 5);
        assert!(questions.iter().all(|q| !q.options.is_empty()));
        assert_eq!(questions[0].question_id, 1);
    }
}
