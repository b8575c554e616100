//! LLM-based candidate reranking with recommendation reasons

use super::{extract_json_object, ChatMessage, LlmClient};
use crate::search::TOP_K;
use std::collections::HashSet;
use std::sync::Arc;

/// Reason attached when the LLM selection had to be backfilled from ranking order
const GENERIC_REASON: &str = "사용자의 요구사항에 적합한 제품입니다.";

/// Compact candidate summary handed to the reranking prompt
#[derive(Debug, Clone)]
pub struct RerankCandidate {
    pub product_code: String,
    pub name: String,
    pub brand: String,
    pub price: i64,
    pub review_count: u32,
    pub review_rating: Option<f64>,
    /// Pre-formatted key specs line, e.g. "무게:1.2kg, CPU:i7, RAM:32GB"
    pub spec_summary: String,
}

/// Selected product with its natural-language reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerankSelection {
    pub product_code: String,
    pub recommendation_reason: String,
}

/// Reranker backed by an external LLM service.
///
/// Selection failures never surface: the fused ranking order backfills any
/// missing slots, so the result is non-empty whenever a candidate exists.
pub struct Reranker {
    client: Arc<dyn LlmClient>,
}

impl Reranker {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Select up to [`TOP_K`] products from `candidates` (given in fused
    /// ranking order) with a short reason for each.
    pub async fn rerank(
        &self,
        user_query: &str,
        user_needs: &str,
        candidates: &[RerankCandidate],
    ) -> Vec<RerankSelection> {
        if candidates.is_empty() {
            return vec![];
        }

        let prompt = build_reranking_prompt(user_query, user_needs, candidates);

        let messages = vec![
            ChatMessage::system(
                "You are a product recommendation assistant. Pick the products that best \
                 match the user's request and explain each pick in one short Korean sentence. \
                 Output ONLY JSON: {\"results\": [{\"product_code\": \"...\", \
                 \"recommendation_reason\": \"...\"}, ...]}",
            ),
            ChatMessage::user(prompt),
        ];

        let selected = match self.client.chat_completion(messages).await {
            Ok(response) => parse_reranking_response(&response, candidates),
            Err(e) => {
                tracing::warn!("LLM reranking failed: {}. Using fused ranking order.", e);
                vec![]
            }
        };

        fill_from_ranking(selected, candidates)
    }
}

fn build_reranking_prompt(
    user_query: &str,
    user_needs: &str,
    candidates: &[RerankCandidate],
) -> String {
    let mut lines = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let rating = candidate
            .review_rating
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "N/A".to_string());
        let specs = if candidate.spec_summary.is_empty() {
            "스펙 정보 없음"
        } else {
            &candidate.spec_summary
        };

        lines.push(format!(
            "{}. [{}] {}\n   가격: {}원 | 리뷰: {}개 | 평점: {}\n   스펙: {}",
            candidate.product_code,
            candidate.brand,
            candidate.name,
            candidate.price,
            candidate.review_count,
            rating,
            specs
        ));
    }

    format!(
        r#"User request: "{}"
User needs: {}

Candidate products (ranked by search relevance):
{}

Select the {} products (fewer if the list is shorter) that best satisfy the
request, ordered best first. For each, give one short Korean sentence explaining
why it fits this user. Use the product codes shown before each candidate.

Output only JSON:
{{"results": [{{"product_code": "...", "recommendation_reason": "..."}}]}}"#,
        user_query,
        user_needs,
        lines.join("\n"),
        TOP_K
    )
}

/// Parse the selection response; unknown codes and duplicates are dropped.
fn parse_reranking_response(
    response: &str,
    candidates: &[RerankCandidate],
) -> Vec<RerankSelection> {
    let json_str = match extract_json_object(response) {
        Some(s) => s,
        None => {
            tracing::warn!("No JSON in reranking response, using fused ranking order");
            return vec![];
        }
    };

    let parsed: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to parse reranking JSON: {}, using fused ranking order", e);
            tracing::debug!("Raw LLM response: {}", response);
            return vec![];
        }
    };

    let known_codes: HashSet<&str> = candidates
        .iter()
        .map(|c| c.product_code.as_str())
        .collect();

    let mut seen = HashSet::new();
    let mut selections = Vec::new();

    if let Some(results) = parsed["results"].as_array() {
        for item in results {
            let Some(code) = item["product_code"].as_str() else {
                continue;
            };
            if !known_codes.contains(code) {
                tracing::warn!("Reranker selected unknown product code: {}", code);
                continue;
            }
            if !seen.insert(code.to_string()) {
                continue;
            }

            let reason = item["recommendation_reason"]
                .as_str()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or(GENERIC_REASON)
                .to_string();

            selections.push(RerankSelection {
                product_code: code.to_string(),
                recommendation_reason: reason,
            });
            if selections.len() >= TOP_K {
                break;
            }
        }
    }

    selections
}

/// Selection in plain fused ranking order, used when the reranker cannot run
/// at all (e.g. the call deadline expired before it started).
pub fn fallback_selections(candidates: &[RerankCandidate]) -> Vec<RerankSelection> {
    fill_from_ranking(Vec::new(), candidates)
}

/// Fill remaining slots from the fused ranking order with a generic reason.
fn fill_from_ranking(
    mut selections: Vec<RerankSelection>,
    candidates: &[RerankCandidate],
) -> Vec<RerankSelection> {
    if selections.len() >= TOP_K {
        selections.truncate(TOP_K);
        return selections;
    }

    let selected_codes: HashSet<String> = selections
        .iter()
        .map(|s| s.product_code.clone())
        .collect();

    for candidate in candidates {
        if selections.len() >= TOP_K {
            break;
        }
        if selected_codes.contains(&candidate.product_code) {
            continue;
        }
        selections.push(RerankSelection {
            product_code: candidate.product_code.clone(),
            recommendation_reason: format!(
                "{}의 {}은(는) {}",
                candidate.brand, candidate.name, GENERIC_REASON
            ),
        });
    }

    selections
}
