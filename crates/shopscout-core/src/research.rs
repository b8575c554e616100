//! Two-phase shopping research flow
//!
//! Phase 1 issues a search id and a short clarifying survey; phase 2 turns the
//! query plus the survey answers into a ranked recommendation set. The search
//! id is advisory only: an expired or unknown session is logged and the
//! request proceeds, because the survey answers travel with the request.

use crate::catalog::{CategoryResolver, ProductIndex, SearchFilter, SessionCache};
use crate::engine::{build_item, to_rerank_candidate, RecommendationItem};
use crate::error::Result;
use crate::llm::{
    ChatMessage, IntentExtractor, LlmClient, QuestionGenerator, ResearchQuestion, SearchIntent,
    TtlCache,
};
use crate::search::{hybrid_candidates, ProductCandidate, MIN_SIMILARITY, TOP_K};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Research sessions live for 30 minutes
pub const SESSION_TTL_SECS: u64 = 1800;

/// Session cache key prefix
const SESSION_KEY_PREFIX: &str = "shopping_research";

/// One answered survey question submitted with a phase-2 request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SurveyResponse {
    pub question_id: u32,
    #[serde(alias = "question")]
    pub question_text: String,
    pub answer: String,
}

/// Phase-1 output: a search id plus the clarifying survey
#[derive(Debug, Clone, Serialize)]
pub struct QuestionSet {
    pub search_id: String,
    pub questions: Vec<ResearchQuestion>,
}

/// Phase-2 output: ranked products for the refined intent.
///
/// The wire key for the list is the singular `product`, which is what
/// existing consumers of this response parse.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchRecommendation {
    pub user_query: String,
    #[serde(rename = "product")]
    pub products: Vec<RankedResearchItem>,
}

/// A ranked research result with its scoring breakdown
#[derive(Debug, Clone, Serialize)]
pub struct RankedResearchItem {
    #[serde(flatten)]
    pub product: RecommendationItem,
    /// Combined hybrid score, rounded to two decimals
    pub similarity_score: f64,
    /// Blend of relevance, rating and review volume, capped at 1.0
    pub performance_score: f64,
    /// 1-based position in the ranked set
    pub match_rank: usize,
    /// Cheapest product among the returned set
    pub is_lowest_price: bool,
    pub ai_review_summary: String,
}

/// The two-phase research pipeline
pub struct ShoppingResearchService {
    index: Arc<dyn ProductIndex>,
    resolver: Arc<CategoryResolver>,
    llm: Arc<dyn LlmClient>,
    sessions: Arc<dyn SessionCache>,
    llm_timeout: Duration,
}

impl ShoppingResearchService {
    pub fn new(
        index: Arc<dyn ProductIndex>,
        resolver: Arc<CategoryResolver>,
        llm: Arc<dyn LlmClient>,
        sessions: Arc<dyn SessionCache>,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            index,
            resolver,
            llm,
            sessions,
            llm_timeout,
        }
    }

    /// Phase 1: issue a search id and generate the clarifying survey.
    ///
    /// Question generation never fails; session persistence failures are
    /// logged and ignored since phase 2 validation is advisory anyway.
    pub async fn generate_questions(&self, user_query: &str) -> QuestionSet {
        let search_id = generate_search_id();

        let generator = QuestionGenerator::new(Arc::clone(&self.llm));
        let questions =
            match tokio::time::timeout(self.llm_timeout, generator.generate(user_query)).await {
                Ok(questions) => questions,
                Err(_) => {
                    tracing::warn!("Question generation timed out. Using defaults.");
                    crate::llm::default_questions()
                }
            };

        let session = serde_json::json!({
            "user_query": user_query,
            "questions": questions,
            "created_at": chrono::Utc::now().to_rfc3339(),
        });
        if let Err(e) = self
            .sessions
            .set(&session_key(&search_id), session, SESSION_TTL_SECS)
            .await
        {
            tracing::warn!("Failed to persist research session {}: {}", search_id, e);
        }

        QuestionSet {
            search_id,
            questions,
        }
    }

    /// Phase 2: turn the query and survey answers into ranked products.
    ///
    /// Products are gated on combined score >= [`MIN_SIMILARITY`] when at
    /// least [`TOP_K`] pass the gate; otherwise the top [`TOP_K`] of the
    /// fused ranking are returned so the user never gets an empty page for
    /// a thin catalog.
    pub async fn recommend_from_survey(
        &self,
        user_query: &str,
        search_id: Option<&str>,
        survey: &[SurveyResponse],
    ) -> Result<ResearchRecommendation> {
        if let Some(id) = search_id {
            self.check_session(id).await;
        }

        let intent = self.analyze_survey(user_query, survey).await;
        tracing::debug!(
            "Survey intent for '{}': category='{}', search_query='{}'",
            user_query,
            intent.category_name,
            intent.search_query
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

        let selected = select_ranked(&candidates);
        let lowest_price = selected
            .iter()
            .map(|c| c.product.lowest_price)
            .min()
            .unwrap_or(0);

        let mut products = Vec::with_capacity(selected.len());
        for (rank, candidate) in selected.iter().enumerate() {
            let reason = self.recommendation_reason(&intent, candidate).await;
            let review_summary = self.review_summary(candidate).await;

            products.push(RankedResearchItem {
                product: build_item(&candidate.product, reason),
                similarity_score: round2(candidate.combined_score),
                performance_score: performance_score(candidate),
                match_rank: rank + 1,
                is_lowest_price: candidate.product.lowest_price == lowest_price,
                ai_review_summary: review_summary,
            });
        }

        Ok(ResearchRecommendation {
            user_query: user_query.to_string(),
            products,
        })
    }

    /// Advisory session lookup: log the outcome, never block the request
    async fn check_session(&self, search_id: &str) {
        match self.sessions.get(&session_key(search_id)).await {
            Ok(Some(_)) => tracing::info!("Research session {} found", search_id),
            Ok(None) => tracing::warn!(
                "Research session {} expired or unknown, proceeding anyway",
                search_id
            ),
            Err(e) => tracing::warn!("Session lookup for {} failed: {}", search_id, e),
        }
    }

    async fn analyze_survey(&self, user_query: &str, survey: &[SurveyResponse]) -> SearchIntent {
        let extractor = IntentExtractor::new(Arc::clone(&self.llm));
        match tokio::time::timeout(
            self.llm_timeout,
            extractor.extract_from_survey(user_query, survey),
        )
        .await
        {
            Ok(intent) => intent,
            Err(_) => {
                tracing::warn!("Survey analysis timed out. Using fallback.");
                SearchIntent::fallback_from_survey(user_query, survey)
            }
        }
    }

    async fn recommendation_reason(
        &self,
        intent: &SearchIntent,
        candidate: &ProductCandidate,
    ) -> String {
        let product = &candidate.product;
        let fallback = format!(
            "{}의 {}은(는) 사용자의 요구사항에 적합한 제품입니다.",
            product.brand, product.name
        );
        let summary = to_rerank_candidate(product).spec_summary;

        let prompt = format!(
            r#"User needs: {}
Product: [{}] {} ({}원)
Specs: {}

Write ONE short Korean sentence explaining why this product fits the user.
No JSON, just the sentence."#,
            intent.user_needs,
            product.brand,
            product.name,
            product.lowest_price,
            if summary.is_empty() { "정보 없음" } else { &summary }
        );

        self.one_sentence(prompt, fallback).await
    }

    async fn review_summary(&self, candidate: &ProductCandidate) -> String {
        let product = &candidate.product;
        let fallback = format!("{}은(는) 우수한 성능과 가성비를 제공합니다.", product.name);
        let rating = product
            .review_rating
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "N/A".to_string());

        let prompt = format!(
            r#"Product: [{}] {}
Reviews: {} reviews, average rating {}

Write ONE short Korean sentence summarizing how buyers rate this product.
No JSON, just the sentence."#,
            product.brand, product.name, product.review_count, rating
        );

        self.one_sentence(prompt, fallback).await
    }

    async fn one_sentence(&self, prompt: String, fallback: String) -> String {
        let messages = vec![
            ChatMessage::system("You are a concise Korean shopping assistant."),
            ChatMessage::user(prompt),
        ];

        match tokio::time::timeout(self.llm_timeout, self.llm.chat_completion(messages)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) => fallback,
            Ok(Err(e)) => {
                tracing::warn!("Sentence generation failed: {}. Using fallback.", e);
                fallback
            }
            Err(_) => {
                tracing::warn!("Sentence generation timed out. Using fallback.");
                fallback
            }
        }
    }
}

/// Similarity gate with a thin-catalog escape hatch: candidates at or above
/// the gate when at least `TOP_K` qualify, else the top `TOP_K` overall.
fn select_ranked(candidates: &[ProductCandidate]) -> Vec<ProductCandidate> {
    let passing: Vec<ProductCandidate> = candidates
        .iter()
        .filter(|c| c.combined_score >= MIN_SIMILARITY)
        .cloned()
        .collect();

    let pool = if passing.len() >= TOP_K {
        passing
    } else {
        candidates.to_vec()
    };

    pool.into_iter().take(TOP_K).collect()
}

/// Blend of relevance, rating and review volume, capped at 1.0
fn performance_score(candidate: &ProductCandidate) -> f64 {
    let rating = candidate.product.review_rating.unwrap_or(0.0);
    let review_bonus = (candidate.product.review_count as f64 / 1000.0).min(0.1);
    let raw = candidate.combined_score * 0.7 + rating / 25.0 + review_bonus;
    round2(raw.min(1.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn session_key(search_id: &str) -> String {
    format!("{}:{}", SESSION_KEY_PREFIX, search_id)
}

static SEARCH_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique opaque search id, e.g. "sr-1f3a9c2e"
pub fn generate_search_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64 ^ d.as_secs())
        .unwrap_or(0);
    let count = SEARCH_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id() as u64;

    // The odd multiplier keeps the counter injective in the low 32 bits, so
    // ids within one process never collide even on a coarse clock
    let mixed = nanos ^ (pid << 16) ^ count.wrapping_mul(0x9e37_79b9);
    format!("sr-{:08x}", mixed as u32)
}

/// Process-local [`SessionCache`] backed by the same TTL cache used for LLM
/// responses. Suitable for the CLI and tests; a shared deployment would put
/// an external keyed store behind the trait instead.
pub struct InMemorySessionCache {
    cache: TtlCache,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self {
            cache: TtlCache::with_ttl(Duration::from_secs(SESSION_TTL_SECS)),
        }
    }
}

impl Default for InMemorySessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn set(&self, key: &str, value: serde_json::Value, ttl_secs: u64) -> Result<()> {
        // Writes double as the expiry sweep; expired sessions are otherwise
        // never revisited
        self.cache.cleanup();
        self.cache
            .set_with_ttl(key.to_string(), value.to_string(), Duration::from_secs(ttl_secs));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        match self.cache.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
