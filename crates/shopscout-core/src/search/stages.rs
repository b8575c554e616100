//! Vector and keyword search stages

use super::{ProductCandidate, KEYWORD_SIMILARITY_THRESHOLD, SEARCH_LIMIT};
use crate::catalog::{ProductIndex, SearchFilter};
use crate::error::Result;
use crate::llm::LlmClient;

/// Embed the search query and run the vector index.
///
/// Distances are cosine distances (0 = identical, 2 = opposite); they convert
/// to similarity with `max(0, 1 - distance/2)`, the single distance-to-score
/// conversion in the engine. An embedding failure degrades to an empty
/// candidate list; a catalog failure propagates.
pub async fn vector_search_stage(
    index: &dyn ProductIndex,
    llm: &dyn LlmClient,
    search_query: &str,
    filter: &SearchFilter,
) -> Result<Vec<ProductCandidate>> {
    let embedding = match llm.embed(search_query).await {
        Ok(embedding) => embedding,
        Err(e) => {
            tracing::warn!("Query embedding failed: {}. Skipping vector search.", e);
            return Ok(vec![]);
        }
    };

    let results = index.vector_search(&embedding, filter, SEARCH_LIMIT).await?;

    Ok(results
        .into_iter()
        .map(|(product, distance)| {
            let similarity = (1.0 - distance / 2.0).max(0.0);
            ProductCandidate {
                product,
                vector_score: similarity,
                keyword_score: 0.0,
                combined_score: 0.0,
            }
        })
        .collect())
}

/// Run trigram keyword search over name/brand.
///
/// Keeps rows with weighted similarity above [`KEYWORD_SIMILARITY_THRESHOLD`].
pub async fn keyword_search_stage(
    index: &dyn ProductIndex,
    keywords: &[String],
    filter: &SearchFilter,
) -> Result<Vec<ProductCandidate>> {
    if keywords.is_empty() {
        return Ok(vec![]);
    }

    let results = index.keyword_search(keywords, filter, SEARCH_LIMIT).await?;

    Ok(results
        .into_iter()
        .filter(|(_, similarity)| *similarity > KEYWORD_SIMILARITY_THRESHOLD)
        .map(|(product, similarity)| ProductCandidate {
            product,
            vector_score: 0.0,
            keyword_score: similarity,
            combined_score: 0.0,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DetailSpec, InMemoryCatalog, Product};
    use crate::error::ShopScoutError;
    use crate::llm::ChatMessage;
    use async_trait::async_trait;

    struct FailingEmbedder;

    #[async_trait]
    impl LlmClient for FailingEmbedder {
        async fn chat_completion(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            Err(ShopScoutError::Llm("down".to_string()))
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(ShopScoutError::Llm("down".to_string()))
        }

        fn embedding_dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn product(code: &str, name: &str) -> Product {
        Product {
            code: code.to_string(),
            name: name.to_string(),
            brand: "브랜드".to_string(),
            lowest_price: 1_000_000,
            status: "판매중".to_string(),
            category_id: None,
            review_count: 0,
            review_rating: None,
            detail_spec: DetailSpec::default(),
            embedding: Some(vec![1.0, 0.0]),
            mall_info: None,
        }
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_empty() {
        let catalog = InMemoryCatalog::new(vec![product("a", "노트북")], vec![]);
        let results = vector_search_stage(
            &catalog,
            &FailingEmbedder,
            "노트북",
            &SearchFilter::purchasable(),
        )
        .await
        .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_keyword_stage_applies_threshold() {
        let catalog = InMemoryCatalog::new(
            vec![product("a", "그램 노트북"), product("b", "전혀무관한상품명")],
            vec![],
        );

        let results = keyword_search_stage(
            &catalog,
            &["그램".to_string(), "노트북".to_string()],
            &SearchFilter::purchasable(),
        )
        .await
        .unwrap();

        assert!(results.iter().all(|c| c.keyword_score > KEYWORD_SIMILARITY_THRESHOLD));
        assert!(results.iter().any(|c| c.product.code == "a"));
        assert!(results.iter().all(|c| c.vector_score == 0.0));
    }

    #[tokio::test]
    async fn test_keyword_stage_empty_keywords() {
        let catalog = InMemoryCatalog::new(vec![product("a", "그램 노트북")], vec![]);
        let results = keyword_search_stage(&catalog, &[], &SearchFilter::purchasable())
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
