//! Search intent extraction using an external LLM service

use super::{extract_json_object, ChatMessage, LlmClient};
use crate::research::SurveyResponse;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Priority dimensions scored by the intent prompt, 1-10 each
const PRIORITY_DIMENSIONS: [&str; 5] = ["portability", "performance", "price", "display", "battery"];

/// Structured search intent extracted from a user query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchIntent {
    /// Free-text category name, resolved later by the CategoryResolver
    pub category_name: String,
    /// Keywords for the lexical search stage
    pub keywords: Vec<String>,
    /// Natural-language query for the vector search stage
    pub search_query: String,
    /// Priority per dimension, 1-10
    pub priorities: BTreeMap<String, u8>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    /// Distilled description of what the user actually needs
    pub user_needs: String,
    /// Short analysis shown to the user alongside the results
    pub analysis_message: String,
}

impl SearchIntent {
    /// Deterministic intent used whenever extraction fails.
    ///
    /// The raw query stands in for every text field so downstream stages
    /// always have something to search with.
    pub fn fallback(user_query: &str) -> Self {
        Self {
            category_name: "노트북".to_string(),
            keywords: vec![user_query.to_string()],
            search_query: user_query.to_string(),
            priorities: uniform_priorities(),
            min_price: None,
            max_price: None,
            user_needs: user_query.to_string(),
            analysis_message: format!("'{}'에 맞는 상품을 찾아봤어요.", user_query),
        }
    }

    /// Deterministic intent for the research flow when survey analysis fails:
    /// query and answers are merged into one search text.
    pub fn fallback_from_survey(user_query: &str, survey: &[SurveyResponse]) -> Self {
        let answers: Vec<String> = survey.iter().map(|s| s.answer.clone()).collect();
        let combined_query = if answers.is_empty() {
            user_query.to_string()
        } else {
            format!("{} {}", user_query, answers.join(" "))
        };

        let mut keywords = vec![user_query.to_string()];
        keywords.extend(answers);

        Self {
            category_name: "상품".to_string(),
            keywords,
            search_query: combined_query,
            priorities: uniform_priorities(),
            min_price: None,
            max_price: None,
            user_needs: user_query.to_string(),
            analysis_message: format!("'{}'에 맞는 상품을 찾아봤어요.", user_query),
        }
    }
}

fn uniform_priorities() -> BTreeMap<String, u8> {
    PRIORITY_DIMENSIONS
        .iter()
        .map(|dim| (dim.to_string(), 5))
        .collect()
}

/// Intent extractor backed by an external LLM service.
///
/// Stateless; extraction failure is always recovered with a deterministic
/// fallback intent and never propagated to the caller.
pub struct IntentExtractor {
    client: Arc<dyn LlmClient>,
}

impl IntentExtractor {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Extract intent from a raw user query (one-shot flow)
    pub async fn extract(&self, user_query: &str) -> SearchIntent {
        let prompt = build_intent_prompt(user_query);

        let messages = vec![
            ChatMessage::system(
                "You are a shopping query analyzer for an e-commerce search engine. \
                 Extract structured intent from user queries. Output ONLY valid JSON with these \
                 fields: product_category (string), keywords (array of strings), search_query \
                 (string), priorities (object, 1-10 per dimension), min_price (number or null), \
                 max_price (number or null), user_needs (string), analysis_message (string).",
            ),
            ChatMessage::user(prompt),
        ];

        match self.client.chat_completion(messages).await {
            Ok(response) => match parse_intent_response(&response, user_query) {
                Ok(intent) => intent,
                Err(e) => {
                    tracing::warn!("Intent extraction parse failed: {}. Using fallback.", e);
                    SearchIntent::fallback(user_query)
                }
            },
            Err(e) => {
                tracing::warn!("Intent extraction call failed: {}. Using fallback.", e);
                SearchIntent::fallback(user_query)
            }
        }
    }

    /// Extract intent from a query plus survey answers (research flow)
    pub async fn extract_from_survey(
        &self,
        user_query: &str,
        survey: &[SurveyResponse],
    ) -> SearchIntent {
        let prompt = build_survey_intent_prompt(user_query, survey);

        let messages = vec![
            ChatMessage::system(
                "You are a shopping survey analyzer. Combine the original query with the \
                 survey answers into one refined search intent. Output ONLY valid JSON with \
                 these fields: product_category (string), keywords (array of strings), \
                 search_query (string), priorities (object, 1-10 per dimension), min_price \
                 (number or null), max_price (number or null), user_needs (string), \
                 analysis_message (string).",
            ),
            ChatMessage::user(prompt),
        ];

        match self.client.chat_completion(messages).await {
            Ok(response) => match parse_intent_response(&response, user_query) {
                Ok(intent) => intent,
                Err(e) => {
                    tracing::warn!("Survey analysis parse failed: {}. Using fallback.", e);
                    SearchIntent::fallback_from_survey(user_query, survey)
                }
            },
            Err(e) => {
                tracing::warn!("Survey analysis call failed: {}. Using fallback.", e);
                SearchIntent::fallback_from_survey(user_query, survey)
            }
        }
    }
}

fn build_intent_prompt(user_query: &str) -> String {
    format!(
        r#"Analyze this shopping query and extract structured intent:

Query: "{}"

Output JSON with:
- product_category: product category name (e.g. "노트북", "모니터")
- keywords: lexical search keywords (array)
- search_query: rephrased natural-language query for semantic search
- priorities: {{"portability": N, "performance": N, "price": N, "display": N, "battery": N}} (1-10)
- min_price / max_price: KRW bounds, or null
- user_needs: one sentence describing the core need
- analysis_message: one friendly Korean sentence summarizing the analysis

Example:
Input: "영상편집용 가벼운 노트북 200만원 이하"
Output: {{"product_category": "노트북", "keywords": ["영상편집", "노트북", "경량"], "search_query": "영상 편집에 적합한 가벼운 고성능 노트북", "priorities": {{"portability": 8, "performance": 9, "price": 6, "display": 7, "battery": 5}}, "min_price": null, "max_price": 2000000, "user_needs": "휴대가 쉬우면서 영상 편집이 가능한 노트북", "analysis_message": "영상 편집이 가능한 가벼운 노트북을 찾아봤어요."}}

Now analyze the query above. Output only JSON:"#,
        user_query
    )
}

fn build_survey_intent_prompt(user_query: &str, survey: &[SurveyResponse]) -> String {
    let survey_text: Vec<String> = survey
        .iter()
        .map(|s| format!("Q{}: {} -> A: {}", s.question_id, s.question_text, s.answer))
        .collect();

    format!(
        r#"Combine this shopping query and survey answers into one refined search intent:

Query: "{}"

Survey:
{}

Output JSON with the same fields as an intent analysis: product_category, keywords,
search_query, priorities (1-10 per dimension), min_price, max_price, user_needs,
analysis_message. The search_query must reflect the survey answers. Output only JSON:"#,
        user_query,
        survey_text.join("\n")
    )
}

fn parse_intent_response(
    response: &str,
    original_query: &str,
) -> Result<SearchIntent, serde_json::Error> {
    let json_str = extract_json_object(response).unwrap_or(response);
    let parsed: serde_json::Value = serde_json::from_str(json_str)?;

    let category_name = parsed["product_category"]
        .as_str()
        .unwrap_or("노트북")
        .to_string();

    let keywords: Vec<String> = parsed["keywords"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .filter(|v: &Vec<String>| !v.is_empty())
        .unwrap_or_else(|| vec![original_query.to_string()]);

    let search_query = parsed["search_query"]
        .as_str()
        .unwrap_or(original_query)
        .to_string();

    let priorities = parsed["priorities"]
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| {
                    // Models sometimes emit fractional scores like 8.5
                    let score = v.as_f64()?.round().clamp(1.0, 10.0) as u8;
                    Some((k.clone(), score))
                })
                .collect()
        })
        .filter(|m: &BTreeMap<String, u8>| !m.is_empty())
        .unwrap_or_else(uniform_priorities);

    let user_needs = parsed["user_needs"]
        .as_str()
        .unwrap_or(original_query)
        .to_string();

    let analysis_message = parsed["analysis_message"]
        .as_str()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("'{}'에 맞는 상품을 찾아봤어요.", original_query));

    Ok(SearchIntent {
        category_name,
        keywords,
        search_query,
        priorities,
        min_price: parsed["min_price"].as_i64(),
        max_price: parsed["max_price"].as_i64(),
        user_needs,
        analysis_message,
    })
}
