//! In-memory catalog index over a product snapshot
//!
//! Stands in for the production vector/trigram indexes: brute-force cosine
//! scan for vector search and pg_trgm-compatible trigram similarity for
//! keyword search. Snapshots load from JSON or CSV exports.

use super::{CategoryRecord, CategoryStore, Product, ProductIndex, SearchFilter};
use crate::error::{Result, ShopScoutError};
use async_trait::async_trait;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Name similarity weight for keyword search
const NAME_WEIGHT: f64 = 0.7;
/// Brand similarity weight for keyword search
const BRAND_WEIGHT: f64 = 0.3;

/// Catalog snapshot held fully in memory
pub struct InMemoryCatalog {
    products: Vec<Arc<Product>>,
    categories: Vec<CategoryRecord>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>, categories: Vec<CategoryRecord>) -> Self {
        Self {
            products: products.into_iter().map(Arc::new).collect(),
            categories,
        }
    }

    /// Load a `{"products": [...], "categories": [...]}` JSON snapshot
    pub fn from_json_file(path: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        struct CatalogSnapshot {
            #[serde(default)]
            products: Vec<Product>,
            #[serde(default)]
            categories: Vec<CategoryRecord>,
        }

        let content = std::fs::read_to_string(path)?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&content)?;
        Ok(Self::new(snapshot.products, snapshot.categories))
    }

    /// Load products from a CSV export. Columns: code, name, brand,
    /// lowest_price, status, category_id, review_count, review_rating,
    /// spec_summary (summary lines joined with " / "). No embeddings, so a
    /// CSV-backed catalog serves the keyword and fallback stages only.
    pub fn from_csv_file(path: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        struct CsvRow {
            code: String,
            name: String,
            #[serde(default)]
            brand: String,
            #[serde(default)]
            lowest_price: i64,
            #[serde(default)]
            status: String,
            #[serde(default)]
            category_id: Option<i64>,
            #[serde(default)]
            review_count: u32,
            #[serde(default)]
            review_rating: Option<f64>,
            #[serde(default)]
            spec_summary: String,
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut products = Vec::new();

        for row in reader.deserialize() {
            let row: CsvRow = row?;
            let spec_summary: Vec<String> = row
                .spec_summary
                .split(" / ")
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
                .collect();

            products.push(Product {
                code: row.code,
                name: row.name,
                brand: row.brand,
                lowest_price: row.lowest_price,
                status: row.status,
                category_id: row.category_id,
                review_count: row.review_count,
                review_rating: row.review_rating,
                detail_spec: super::DetailSpec {
                    spec_summary,
                    spec: Default::default(),
                },
                embedding: None,
                mall_info: None,
            });
        }

        Ok(Self::new(products, vec![]))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn embedded_count(&self) -> usize {
        self.products.iter().filter(|p| p.embedding.is_some()).count()
    }
}

#[async_trait]
impl ProductIndex for InMemoryCatalog {
    async fn vector_search(
        &self,
        embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<(Arc<Product>, f64)>> {
        if embedding.is_empty() {
            return Err(ShopScoutError::Search("empty query embedding".to_string()));
        }

        let mut scored: Vec<(Arc<Product>, f64)> = self
            .products
            .iter()
            .filter(|p| filter.allows(p))
            .filter_map(|p| {
                let product_embedding = p.embedding.as_ref()?;
                if product_embedding.len() != embedding.len() {
                    return None;
                }
                Some((Arc::clone(p), cosine_distance(embedding, product_embedding)))
            })
            .collect();

        // Distance ascending: closest first
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn keyword_search(
        &self,
        terms: &[String],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<(Arc<Product>, f64)>> {
        if terms.is_empty() {
            return Ok(vec![]);
        }

        let search_text = terms.join(" ");

        let mut scored: Vec<(Arc<Product>, f64)> = self
            .products
            .iter()
            .filter(|p| filter.allows(p))
            .filter_map(|p| {
                let similarity = NAME_WEIGHT * trigram_similarity(&search_text, &p.name)
                    + BRAND_WEIGHT * trigram_similarity(&search_text, &p.brand);
                if similarity > 0.0 {
                    Some((Arc::clone(p), similarity))
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn substring_search(
        &self,
        terms: &[String],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<Arc<Product>>> {
        if terms.is_empty() {
            return Ok(vec![]);
        }

        let terms_lower: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();

        let mut matched: Vec<Arc<Product>> = self
            .products
            .iter()
            .filter(|p| filter.allows(p))
            .filter(|p| {
                let name = p.name.to_lowercase();
                let brand = p.brand.to_lowercase();
                terms_lower
                    .iter()
                    .any(|t| name.contains(t.as_str()) || brand.contains(t.as_str()))
            })
            .map(Arc::clone)
            .collect();

        matched.sort_by(|a, b| {
            b.review_count
                .cmp(&a.review_count)
                .then_with(|| {
                    let ra = a.review_rating.unwrap_or(0.0);
                    let rb = b.review_rating.unwrap_or(0.0);
                    rb.partial_cmp(&ra).unwrap_or(Ordering::Equal)
                })
        });
        matched.truncate(limit);
        Ok(matched)
    }
}

#[async_trait]
impl CategoryStore for InMemoryCatalog {
    async fn list_all(&self) -> Result<Vec<CategoryRecord>> {
        Ok(self.categories.clone())
    }
}

/// Cosine distance between two vectors: 0 = identical, 2 = opposite
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

/// Cosine similarity in [-1, 1]; zero-magnitude vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// pg_trgm-compatible trigram similarity: words are lowercased, padded with
/// two leading and one trailing space, and compared as trigram sets
/// (shared / union).
pub(crate) fn trigram_similarity(a: &str, b: &str) -> f64 {
    let ta = trigram_set(a);
    let tb = trigram_set(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let shared = ta.intersection(&tb).count();
    if shared == 0 {
        return 0.0;
    }
    shared as f64 / (ta.len() + tb.len() - shared) as f64
}

fn trigram_set(text: &str) -> HashSet<String> {
    let mut set = HashSet::new();

    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = std::iter::repeat(' ')
            .take(2)
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();

        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DetailSpec;

    fn product(code: &str, name: &str, brand: &str, embedding: Option<Vec<f32>>) -> Product {
        Product {
            code: code.to_string(),
            name: name.to_string(),
            brand: brand.to_string(),
            lowest_price: 1_000_000,
            status: "판매중".to_string(),
            category_id: Some(1),
            review_count: 10,
            review_rating: Some(4.0),
            detail_spec: DetailSpec::default(),
            embedding,
            mall_info: None,
        }
    }

    #[test]
    fn test_trigram_identical_strings() {
        assert!((trigram_similarity("LG gram", "LG gram") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_trigram_disjoint_strings() {
        assert_eq!(trigram_similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_trigram_partial_overlap() {
        let sim = trigram_similarity("게이밍 노트북", "노트북");
        assert!(sim > 0.0 && sim < 1.0);
    }

    #[test]
    fn test_cosine_distance_bounds() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        let c = vec![-1.0f32, 0.0];

        assert!((cosine_distance(&a, &a)).abs() < 1e-9);
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-9);
        assert!((cosine_distance(&a, &c) - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_vector_search_orders_by_distance() {
        let catalog = InMemoryCatalog::new(
            vec![
                product("far", "Far", "B", Some(vec![0.0, 1.0])),
                product("near", "Near", "B", Some(vec![1.0, 0.1])),
                product("noemb", "NoEmbedding", "B", None),
            ],
            vec![],
        );

        let results = catalog
            .vector_search(&[1.0, 0.0], &SearchFilter::purchasable(), 10)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.code, "near");
        assert!(results[0].1 < results[1].1);
    }

    #[tokio::test]
    async fn test_keyword_search_prefers_name_match() {
        let catalog = InMemoryCatalog::new(
            vec![
                product("a", "그램 노트북 17인치", "LG", None),
                product("b", "모니터 32인치", "LG", None),
            ],
            vec![],
        );

        let results = catalog
            .keyword_search(
                &["그램".to_string(), "노트북".to_string()],
                &SearchFilter::purchasable(),
                10,
            )
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].0.code, "a");
    }

    #[tokio::test]
    async fn test_substring_search_or_semantics_and_review_order() {
        let mut popular = product("pop", "울트라 슬림 노트북", "삼성", None);
        popular.review_count = 500;
        let mut niche = product("niche", "노트북 거치대", "기타브랜드", None);
        niche.review_count = 3;

        let catalog = InMemoryCatalog::new(vec![niche, popular], vec![]);

        let results = catalog
            .substring_search(
                &["노트북".to_string(), "없는단어".to_string()],
                &SearchFilter::purchasable(),
                10,
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].code, "pop");
    }

    #[test]
    fn test_json_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{
                "products": [
                    {"code": "p1", "name": "그램 노트북", "brand": "LG전자",
                     "lowest_price": 1500000, "status": "판매중", "category_id": 1,
                     "embedding": [0.1, 0.2]}
                ],
                "categories": [{"id": 1, "name": "노트북"}]
            }"#,
        )
        .unwrap();

        let catalog = InMemoryCatalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.embedded_count(), 1);
    }

    #[test]
    fn test_csv_snapshot_loads_without_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.csv");
        std::fs::write(
            &path,
            "code,name,brand,lowest_price,status,category_id,review_count,review_rating,spec_summary\n\
             p1,그램 노트북,LG전자,1500000,판매중,1,42,4.5,1.2kg / 40.6cm(16인치)\n",
        )
        .unwrap();

        let catalog = InMemoryCatalog::from_csv_file(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.embedded_count(), 0);
    }

    #[tokio::test]
    async fn test_filter_applies_before_limit() {
        let mut discontinued = product("dead", "그램 노트북", "LG", Some(vec![1.0, 0.0]));
        discontinued.status = "단종".to_string();

        let catalog = InMemoryCatalog::new(vec![discontinued], vec![]);

        let vector = catalog
            .vector_search(&[1.0, 0.0], &SearchFilter::purchasable(), 10)
            .await
            .unwrap();
        assert!(vector.is_empty());

        let keyword = catalog
            .keyword_search(&["그램".to_string()], &SearchFilter::purchasable(), 10)
            .await
            .unwrap();
        assert!(keyword.is_empty());
    }
}
