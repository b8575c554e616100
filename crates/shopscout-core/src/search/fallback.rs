//! Substring fallback search for sparse hybrid results

use super::{ProductCandidate, FALLBACK_SCORE, SEARCH_LIMIT};
use crate::catalog::{ProductIndex, SearchFilter};
use crate::error::Result;

/// Build the fallback term set: intent keywords plus raw-query tokens,
/// keeping only terms of two or more characters.
pub fn fallback_terms(user_query: &str, keywords: &[String]) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();

    for term in keywords
        .iter()
        .map(|s| s.as_str())
        .chain(user_query.split_whitespace())
    {
        let term = term.trim();
        if term.chars().count() >= 2 && !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
    }

    terms
}

/// Substring-match safety net across name/brand (OR semantics).
///
/// Results carry a fixed neutral score on both signals; ordering comes from
/// the index (review_count desc, review_rating desc). No vector/keyword
/// weighting is ever applied here.
pub async fn fallback_search(
    index: &dyn ProductIndex,
    user_query: &str,
    keywords: &[String],
    filter: &SearchFilter,
) -> Result<Vec<ProductCandidate>> {
    let terms = fallback_terms(user_query, keywords);
    if terms.is_empty() {
        return Ok(vec![]);
    }

    let products = index.substring_search(&terms, filter, SEARCH_LIMIT).await?;

    Ok(products
        .into_iter()
        .map(|product| ProductCandidate {
            product,
            vector_score: FALLBACK_SCORE,
            keyword_score: FALLBACK_SCORE,
            combined_score: FALLBACK_SCORE,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DetailSpec, InMemoryCatalog, Product};

    #[test]
    fn test_fallback_terms_filters_short_tokens() {
        let terms = fallback_terms("LG 그램 16 추천해줘", &["노트북".to_string()]);
        assert_eq!(terms, vec!["노트북", "LG", "그램", "16", "추천해줘"]);
    }

    #[test]
    fn test_fallback_terms_deduplicates() {
        let terms = fallback_terms("노트북 추천", &["노트북".to_string()]);
        assert_eq!(terms, vec!["노트북", "추천"]);
    }

    #[test]
    fn test_fallback_terms_single_char_dropped() {
        let terms = fallback_terms("a b c", &[]);
        assert!(terms.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_assigns_neutral_scores() {
        let catalog = InMemoryCatalog::new(
            vec![Product {
                code: "lg1".to_string(),
                name: "그램 프로".to_string(),
                brand: "LG전자".to_string(),
                lowest_price: 1_800_000,
                status: "판매중".to_string(),
                category_id: None,
                review_count: 42,
                review_rating: Some(4.7),
                detail_spec: DetailSpec::default(),
                embedding: None,
                mall_info: None,
            }],
            vec![],
        );

        let results = fallback_search(&catalog, "LG 노트북", &[], &SearchFilter::purchasable())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].vector_score, FALLBACK_SCORE);
        assert_eq!(results[0].keyword_score, FALLBACK_SCORE);
        assert_eq!(results[0].combined_score, FALLBACK_SCORE);
    }
}
