//! Hybrid search pipeline
//!
//! Vector and keyword stages run concurrently, their candidates are fused by
//! weighted score, and a substring fallback fills in when the fused set is
//! sparse. The same pipeline backs the one-shot recommendation flow and the
//! two-phase shopping research flow.

mod fallback;
mod fusion;
mod specs;
mod stages;

pub use fallback::{fallback_search, fallback_terms};
pub use fusion::{fuse_results, merge_fallback, sort_candidates};
pub use specs::{extract_display_specs, DisplaySpecs};
pub use stages::{keyword_search_stage, vector_search_stage};

use crate::catalog::{Product, ProductIndex, SearchFilter};
use crate::error::Result;
use crate::llm::{LlmClient, SearchIntent};
use std::sync::Arc;

/// Candidates fetched per search stage
pub const SEARCH_LIMIT: usize = 50;

/// Final number of recommendations returned to the user
pub const TOP_K: usize = 5;

/// Weight of the vector signal in the combined score
pub const VECTOR_WEIGHT: f64 = 0.7;

/// Weight of the keyword signal in the combined score
pub const KEYWORD_WEIGHT: f64 = 0.3;

/// Minimum weighted trigram similarity for a keyword candidate
pub const KEYWORD_SIMILARITY_THRESHOLD: f64 = 0.05;

/// Fixed neutral score assigned to fallback-search results
pub const FALLBACK_SCORE: f64 = 0.3;

/// Fused candidates handed to the LLM reranker
pub const RERANK_CANDIDATES: usize = 20;

/// Combined-score gate for the shopping research flow
pub const MIN_SIMILARITY: f64 = 0.90;

/// A product candidate in the fused result set, unique per product code
#[derive(Debug, Clone)]
pub struct ProductCandidate {
    pub product: Arc<Product>,
    pub vector_score: f64,
    pub keyword_score: f64,
    pub combined_score: f64,
}

/// Run the full candidate pipeline for an intent: vector and keyword stages
/// concurrently, fusion, then substring fallback when the fused set has
/// fewer than `SEARCH_LIMIT / 2` entries.
///
/// Catalog failures propagate; embedding failures degrade to keyword-only.
pub async fn hybrid_candidates(
    index: &dyn ProductIndex,
    llm: &dyn LlmClient,
    intent: &SearchIntent,
    user_query: &str,
    filter: &SearchFilter,
) -> Result<Vec<ProductCandidate>> {
    let (vector_results, keyword_results) = tokio::join!(
        vector_search_stage(index, llm, &intent.search_query, filter),
        keyword_search_stage(index, &intent.keywords, filter),
    );

    let mut fused = fuse_results(vector_results?, keyword_results?);

    if fused.len() < SEARCH_LIMIT / 2 {
        tracing::info!(
            "Hybrid search returned only {} results. Running fallback search.",
            fused.len()
        );
        let fallback = fallback_search(index, user_query, &intent.keywords, filter).await?;
        merge_fallback(&mut fused, fallback);
    }

    Ok(fused)
}
