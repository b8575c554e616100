//! Integration tests for the one-shot recommendation flow
//!
//! Drives the full pipeline with a scripted LLM and an in-memory catalog:
//! intent extraction, category filtering, hybrid search, reranking, and the
//! degraded paths when the LLM misbehaves.

use async_trait::async_trait;
use shopscout_core::{
    CategoryRecord, CategoryResolver, CategoryStore, ChatMessage, DetailSpec, InMemoryCatalog,
    LlmClient, Product, RecommendationEngine, Result, ShopScoutError, TOP_K,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays canned chat responses in call order; errors once the script runs
/// out. Embeddings are fixed.
struct ScriptedLlm {
    chat: Mutex<VecDeque<String>>,
    embedding: Vec<f32>,
}

impl ScriptedLlm {
    fn new(responses: &[&str], embedding: Vec<f32>) -> Self {
        Self {
            chat: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            embedding,
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(&self, _messages: Vec<ChatMessage>) -> Result<String> {
        self.chat
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .ok_or_else(|| ShopScoutError::Llm("script exhausted".to_string()))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.embedding.clone())
    }

    fn embedding_dimensions(&self) -> usize {
        self.embedding.len()
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn product(
    code: &str,
    name: &str,
    category_id: i64,
    price: i64,
    reviews: u32,
    embedding: Vec<f32>,
) -> Product {
    Product {
        code: code.to_string(),
        name: name.to_string(),
        brand: "테스트브랜드".to_string(),
        lowest_price: price,
        status: "판매중".to_string(),
        category_id: Some(category_id),
        review_count: reviews,
        review_rating: Some(4.2),
        detail_spec: DetailSpec::default(),
        embedding: Some(embedding),
        mall_info: None,
    }
}

fn categories() -> Vec<CategoryRecord> {
    vec![
        CategoryRecord {
            id: 1,
            name: "노트북".to_string(),
            parent_id: None,
        },
        CategoryRecord {
            id: 2,
            name: "게이밍노트북".to_string(),
            parent_id: Some(1),
        },
        CategoryRecord {
            id: 9,
            name: "모니터".to_string(),
            parent_id: None,
        },
    ]
}

fn engine(catalog: InMemoryCatalog, llm: Arc<dyn LlmClient>) -> RecommendationEngine {
    let catalog = Arc::new(catalog);
    let resolver = Arc::new(CategoryResolver::new(
        Arc::clone(&catalog) as Arc<dyn CategoryStore>
    ));
    RecommendationEngine::new(catalog, resolver, llm, Duration::from_secs(5))
}

const INTENT_JSON: &str = r#"{"product_category": "노트북", "keywords": ["게이밍", "노트북"],
    "search_query": "고성능 게이밍 노트북",
    "priorities": {"portability": 3, "performance": 9, "price": 6, "display": 7, "battery": 4},
    "min_price": null, "max_price": 2000000,
    "user_needs": "게임이 잘 돌아가는 노트북",
    "analysis_message": "게이밍 노트북을 찾아봤어요."}"#;

#[tokio::test]
async fn test_full_flow_with_scripted_llm() {
    let products = vec![
        product("note-1", "게이밍 노트북 A", 2, 1_800_000, 300, vec![1.0, 0.0]),
        product("note-2", "게이밍 노트북 B", 2, 1_500_000, 120, vec![0.9, 0.1]),
        product("note-3", "사무용 노트북 C", 1, 900_000, 40, vec![0.5, 0.5]),
    ];
    // Script: intent, rerank, analysis message
    let llm = Arc::new(ScriptedLlm::new(
        &[
            INTENT_JSON,
            r#"{"results": [
                {"product_code": "note-2", "recommendation_reason": "가성비가 뛰어납니다."},
                {"product_code": "note-1", "recommendation_reason": "성능이 가장 좋습니다."}
            ]}"#,
            "게임용 고성능 노트북 위주로 3개를 찾아봤어요.",
        ],
        vec![1.0, 0.0],
    ));

    let engine = engine(InMemoryCatalog::new(products, categories()), llm);
    let result = engine.recommend("게이밍 노트북 추천").await.unwrap();

    assert!(result.recommended_products.len() <= TOP_K);
    // LLM picks lead, backfill follows fused order
    assert_eq!(result.recommended_products[0].product_code, "note-2");
    assert_eq!(
        result.recommended_products[0].recommendation_reason,
        "가성비가 뛰어납니다."
    );
    assert_eq!(result.recommended_products[1].product_code, "note-1");
    assert_eq!(
        result.analysis_message,
        "게임용 고성능 노트북 위주로 3개를 찾아봤어요."
    );
}

#[tokio::test]
async fn test_category_filter_excludes_other_subtrees() {
    let products = vec![
        product("note-1", "게이밍 노트북 A", 2, 1_800_000, 300, vec![1.0, 0.0]),
        // Perfect vector match but wrong category subtree
        product("mon-1", "게이밍 모니터 Z", 9, 500_000, 900, vec![1.0, 0.0]),
    ];
    let llm = Arc::new(ScriptedLlm::new(&[INTENT_JSON], vec![1.0, 0.0]));

    let engine = engine(InMemoryCatalog::new(products, categories()), llm);
    let result = engine.recommend("게이밍 노트북 추천").await.unwrap();

    assert!(!result.recommended_products.is_empty());
    assert!(result
        .recommended_products
        .iter()
        .all(|item| item.product_code != "mon-1"));
}

#[tokio::test]
async fn test_rerank_failure_falls_back_to_fused_order() {
    let products: Vec<Product> = (0..8)
        .map(|i| {
            product(
                &format!("note-{}", i),
                &format!("노트북 모델 {}", i),
                1,
                1_000_000,
                (8 - i) * 100,
                vec![1.0 - i as f32 * 0.1, i as f32 * 0.1],
            )
        })
        .collect();
    // Intent succeeds, rerank gets garbage, analysis errors out (script ends)
    let llm = Arc::new(ScriptedLlm::new(
        &[INTENT_JSON, "I cannot pick any products, sorry!"],
        vec![1.0, 0.0],
    ));

    let engine = engine(InMemoryCatalog::new(products, categories()), llm);
    let result = engine.recommend("게이밍 노트북 추천").await.unwrap();

    assert_eq!(result.recommended_products.len(), TOP_K);
    // Fused order: note-0 has the closest embedding and the most reviews
    assert_eq!(result.recommended_products[0].product_code, "note-0");
    assert!(result
        .recommended_products
        .iter()
        .all(|item| !item.recommendation_reason.is_empty()));
}

#[tokio::test]
async fn test_price_bound_from_intent_is_applied() {
    let products = vec![
        product("cheap", "게이밍 노트북 저가", 2, 1_200_000, 10, vec![1.0, 0.0]),
        product("pricey", "게이밍 노트북 고가", 2, 3_500_000, 800, vec![1.0, 0.0]),
    ];
    let llm = Arc::new(ScriptedLlm::new(&[INTENT_JSON], vec![1.0, 0.0]));

    let engine = engine(InMemoryCatalog::new(products, categories()), llm);
    let result = engine.recommend("게이밍 노트북 추천").await.unwrap();

    assert!(result
        .recommended_products
        .iter()
        .all(|item| item.product_code != "pricey"));
}

#[tokio::test]
async fn test_repeat_runs_are_deterministic() {
    let products: Vec<Product> = (0..10)
        .map(|i| {
            product(
                &format!("note-{}", i),
                &format!("노트북 모델 {}", i),
                1,
                1_000_000,
                50,
                vec![0.8, 0.2],
            )
        })
        .collect();

    let mut orders = Vec::new();
    for _ in 0..2 {
        // Empty script: every LLM call fails, all fallbacks deterministic
        let llm = Arc::new(ScriptedLlm::new(&[], vec![1.0, 0.0]));
        let engine = engine(InMemoryCatalog::new(products.clone(), categories()), llm);
        let result = engine.recommend("노트북 추천").await.unwrap();
        let codes: Vec<String> = result
            .recommended_products
            .iter()
            .map(|item| item.product_code.clone())
            .collect();
        orders.push(codes);
    }

    assert_eq!(orders[0], orders[1]);
    assert!(!orders[0].is_empty());
}

#[tokio::test]
async fn test_substring_fallback_finds_thin_catalog_product() {
    // No embedding, and "그램" only appears as an infix of a longer word, so
    // neither the vector nor the trigram stage can surface this product
    let products = vec![Product {
        embedding: None,
        ..product("gram-1", "울트라그램16 2024", 1, 2_000_000, 77, vec![])
    }];
    let llm = Arc::new(ScriptedLlm::new(&[], vec![1.0, 0.0]));

    let engine = engine(InMemoryCatalog::new(products, categories()), llm);
    let result = engine.recommend("그램 추천해줘").await.unwrap();

    assert_eq!(result.recommended_products.len(), 1);
    assert_eq!(result.recommended_products[0].product_code, "gram-1");
}
