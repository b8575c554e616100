//! ShopScout Core Library
//!
//! Core functionality for the ShopScout hybrid product search and
//! recommendation engine.
//!
//! # Features
//! - LLM-powered search intent extraction from queries and surveys
//! - Hybrid retrieval: vector similarity fused with trigram keyword search
//! - Substring fallback search for sparse result sets
//! - LLM reranking with per-product recommendation reasons
//! - Two-phase shopping research flow with expiring sessions

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod research;
pub mod search;

pub use catalog::{
    CategoryRecord, CategoryResolver, CategoryStore, DetailSpec, InMemoryCatalog, MallInfo,
    Product, ProductIndex, SearchFilter, SessionCache, TERMINAL_STATUSES,
};
pub use config::{Config, LlmServiceConfig};
pub use engine::{Recommendation, RecommendationEngine, RecommendationItem};
pub use error::{Error, Result, ShopScoutError};
pub use llm::{
    default_questions, ChatMessage, IntentExtractor, LlmClient, OpenAiClient, QuestionGenerator,
    RerankCandidate, RerankSelection, Reranker, ResearchQuestion, SearchIntent, TtlCache,
};
pub use research::{
    generate_search_id, InMemorySessionCache, QuestionSet, RankedResearchItem,
    ResearchRecommendation, ShoppingResearchService, SurveyResponse, SESSION_TTL_SECS,
};
pub use search::{
    extract_display_specs, hybrid_candidates, DisplaySpecs, ProductCandidate, FALLBACK_SCORE,
    KEYWORD_WEIGHT, MIN_SIMILARITY, RERANK_CANDIDATES, SEARCH_LIMIT, TOP_K, VECTOR_WEIGHT,
};
