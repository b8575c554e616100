//! One-shot recommendation flow
//!
//! Query in, up to five recommended products out: intent extraction, category
//! resolution, hybrid candidate search, LLM reranking, and a user-facing
//! analysis message. Every LLM call is deadline-bounded and recovers with a
//! deterministic fallback; the only hard failure is an unavailable catalog.

use crate::catalog::{CategoryResolver, Product, ProductIndex, SearchFilter};
use crate::error::Result;
use crate::llm::{
    fallback_selections, ChatMessage, IntentExtractor, LlmClient, RerankCandidate,
    RerankSelection, Reranker, SearchIntent,
};
use crate::search::{
    extract_display_specs, hybrid_candidates, DisplaySpecs, ProductCandidate, RERANK_CANDIDATES,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// A recommendation result for one user query
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub user_query: String,
    /// One friendly Korean sentence explaining how the query was understood
    pub analysis_message: String,
    pub recommended_products: Vec<RecommendationItem>,
}

/// One recommended product, fully denormalized for presentation
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationItem {
    pub product_code: String,
    pub name: String,
    pub brand: String,
    pub price: i64,
    pub thumbnail_url: Option<String>,
    pub product_detail_url: Option<String>,
    pub recommendation_reason: String,
    pub specs: DisplaySpecs,
    pub review_count: u32,
    pub review_rating: Option<f64>,
}

/// The one-shot recommendation pipeline.
///
/// Holds its collaborators behind trait objects so tests and the CLI can
/// swap catalog and LLM backends freely.
pub struct RecommendationEngine {
    index: Arc<dyn ProductIndex>,
    resolver: Arc<CategoryResolver>,
    llm: Arc<dyn LlmClient>,
    llm_timeout: Duration,
}

impl RecommendationEngine {
    pub fn new(
        index: Arc<dyn ProductIndex>,
        resolver: Arc<CategoryResolver>,
        llm: Arc<dyn LlmClient>,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            index,
            resolver,
            llm,
            llm_timeout,
        }
    }

    /// Run the full pipeline for a user query.
    ///
    /// LLM failures and deadline overruns degrade step by step; an empty
    /// result set is a valid outcome, not an error. Only catalog access
    /// failures propagate.
    pub async fn recommend(&self, user_query: &str) -> Result<Recommendation> {
        let intent = self.extract_intent(user_query).await;
        tracing::debug!(
            "Intent for '{}': category='{}', keywords={:?}",
            user_query,
            intent.category_name,
            intent.keywords
        );

        let category_ids = self.resolver.resolve_subtree(&intent.category_name).await?;
        let filter = SearchFilter {
            category_ids,
            min_price: intent.min_price,
            max_price: intent.max_price,
            ..SearchFilter::purchasable()
        };

        let candidates =
            hybrid_candidates(self.index.as_ref(), self.llm.as_ref(), &intent, user_query, &filter)
                .await?;

        if candidates.is_empty() {
            tracing::info!("No candidates for '{}'", user_query);
            return Ok(Recommendation {
                user_query: user_query.to_string(),
                analysis_message: format!(
                    "'{}'에 맞는 상품을 찾지 못했어요. 다른 검색어로 시도해 보세요.",
                    user_query
                ),
                recommended_products: vec![],
            });
        }

        let pool = &candidates[..candidates.len().min(RERANK_CANDIDATES)];
        let selections = self.rerank(user_query, &intent, pool).await;
        let items = assemble_items(&selections, pool);

        let analysis_message = self.analysis_message(user_query, &intent, items.len()).await;

        Ok(Recommendation {
            user_query: user_query.to_string(),
            analysis_message,
            recommended_products: items,
        })
    }

    async fn extract_intent(&self, user_query: &str) -> SearchIntent {
        let extractor = IntentExtractor::new(Arc::clone(&self.llm));
        match tokio::time::timeout(self.llm_timeout, extractor.extract(user_query)).await {
            Ok(intent) => intent,
            Err(_) => {
                tracing::warn!("Intent extraction timed out. Using fallback.");
                SearchIntent::fallback(user_query)
            }
        }
    }

    async fn rerank(
        &self,
        user_query: &str,
        intent: &SearchIntent,
        pool: &[ProductCandidate],
    ) -> Vec<RerankSelection> {
        let rerank_candidates: Vec<RerankCandidate> =
            pool.iter().map(|c| to_rerank_candidate(&c.product)).collect();

        let reranker = Reranker::new(Arc::clone(&self.llm));
        match tokio::time::timeout(
            self.llm_timeout,
            reranker.rerank(user_query, &intent.user_needs, &rerank_candidates),
        )
        .await
        {
            Ok(selections) => selections,
            Err(_) => {
                tracing::warn!("Reranking timed out. Using fused ranking order.");
                fallback_selections(&rerank_candidates)
            }
        }
    }

    /// One friendly Korean sentence summarizing the analysis, generated by
    /// the LLM from the extracted priorities.
    async fn analysis_message(
        &self,
        user_query: &str,
        intent: &SearchIntent,
        result_count: usize,
    ) -> String {
        let fallback = format!(
            "'{}'에 맞는 상품 {}개를 추천해드려요.",
            user_query, result_count
        );

        let priority_lines: Vec<String> = intent
            .priorities
            .iter()
            .map(|(dim, score)| format!("- {}: {}", dim, priority_bucket(*score)))
            .collect();

        let prompt = format!(
            r#"User searched for: "{}"
Understood needs: {}
Priorities:
{}

Write ONE friendly Korean sentence (ending in 요) telling the user how their
request was understood and that {} matching products were found. No JSON,
just the sentence."#,
            user_query,
            intent.user_needs,
            priority_lines.join("\n"),
            result_count
        );

        let messages = vec![
            ChatMessage::system("You are a friendly Korean shopping assistant."),
            ChatMessage::user(prompt),
        ];

        let call = self.llm.chat_completion(messages);
        match tokio::time::timeout(self.llm_timeout, call).await {
            Ok(Ok(message)) => {
                let message = message.trim();
                if message.is_empty() {
                    fallback
                } else {
                    message.to_string()
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Analysis message generation failed: {}. Using fallback.", e);
                fallback
            }
            Err(_) => {
                tracing::warn!("Analysis message generation timed out. Using fallback.");
                fallback
            }
        }
    }
}

fn priority_bucket(score: u8) -> &'static str {
    if score >= 7 {
        "높음"
    } else if score >= 4 {
        "중간"
    } else {
        "낮음"
    }
}

pub(crate) fn to_rerank_candidate(product: &Product) -> RerankCandidate {
    RerankCandidate {
        product_code: product.code.clone(),
        name: product.name.clone(),
        brand: product.brand.clone(),
        price: product.lowest_price,
        review_count: product.review_count,
        review_rating: product.review_rating,
        spec_summary: extract_display_specs(&product.detail_spec).summary_line(),
    }
}

/// Join selections back to their products, preserving selection order.
fn assemble_items(
    selections: &[RerankSelection],
    pool: &[ProductCandidate],
) -> Vec<RecommendationItem> {
    selections
        .iter()
        .filter_map(|selection| {
            let candidate = pool
                .iter()
                .find(|c| c.product.code == selection.product_code)?;
            Some(build_item(&candidate.product, selection.recommendation_reason.clone()))
        })
        .collect()
}

pub(crate) fn build_item(product: &Product, recommendation_reason: String) -> RecommendationItem {
    let mall_info = product.mall_info.as_ref();
    RecommendationItem {
        product_code: product.code.clone(),
        name: product.name.clone(),
        brand: product.brand.clone(),
        price: product.lowest_price,
        thumbnail_url: mall_info.and_then(|m| m.representative_image_url.clone()),
        product_detail_url: mall_info.and_then(|m| m.product_page_url.clone()),
        recommendation_reason,
        specs: extract_display_specs(&product.detail_spec),
        review_count: product.review_count,
        review_rating: product.review_rating,
    }
}
