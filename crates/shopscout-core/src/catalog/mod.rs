//! Product catalog domain types and collaborator interfaces
//!
//! The engine never talks to a concrete store: vector, keyword and substring
//! search go through [`ProductIndex`], category metadata through
//! [`CategoryStore`], and research sessions through [`SessionCache`]. The
//! bundled [`InMemoryCatalog`] implements the first two against a catalog
//! snapshot for the CLI and tests.

mod category;
mod memory;

pub use category::CategoryResolver;
pub use memory::InMemoryCatalog;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Statuses that mean a product cannot actually be bought
pub const TERMINAL_STATUSES: [&str; 3] = ["단종", "판매중지", "품절"];

/// A catalog product, keyed by its external product code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Opaque external catalog identifier (marketplace item id)
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub lowest_price: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub review_rating: Option<f64>,
    #[serde(default)]
    pub detail_spec: DetailSpec,
    /// Embedding of the product's spec text; absent products are skipped by
    /// the vector stage
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub mall_info: Option<MallInfo>,
}

/// Heterogeneous spec blob: free-text summary lines plus a loosely-typed map
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailSpec {
    #[serde(default)]
    pub spec_summary: Vec<String>,
    #[serde(default)]
    pub spec: BTreeMap<String, serde_json::Value>,
}

/// Third-party listing metadata attached to a product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MallInfo {
    #[serde(default)]
    pub mall_name: Option<String>,
    #[serde(default)]
    pub product_page_url: Option<String>,
    #[serde(default)]
    pub representative_image_url: Option<String>,
}

/// A category row from the catalog's category table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Typed search filter passed to every [`ProductIndex`] operation.
///
/// `category_ids` already contains the resolved category and all of its
/// descendants; the index never re-expands the subtree.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub category_ids: Option<Vec<i64>>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub exclude_statuses: Vec<String>,
}

impl SearchFilter {
    /// Filter excluding terminal product statuses, no category or price bounds
    pub fn purchasable() -> Self {
        Self {
            exclude_statuses: TERMINAL_STATUSES.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Whether a product passes this filter
    pub fn allows(&self, product: &Product) -> bool {
        if self.exclude_statuses.iter().any(|s| s == &product.status) {
            return false;
        }
        if let Some(ref ids) = self.category_ids {
            match product.category_id {
                Some(id) if ids.contains(&id) => {}
                _ => return false,
            }
        }
        if let Some(min) = self.min_price {
            if product.lowest_price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.lowest_price > max {
                return false;
            }
        }
        true
    }
}

/// Catalog search interface (vector index, trigram index, substring scan)
#[async_trait]
pub trait ProductIndex: Send + Sync {
    /// Nearest-neighbor search over spec embeddings.
    ///
    /// Returns (product, cosine distance) ordered by distance ascending.
    async fn vector_search(
        &self,
        embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<(Arc<Product>, f64)>>;

    /// Trigram similarity search over name/brand.
    ///
    /// Returns (product, weighted similarity) ordered by similarity descending.
    async fn keyword_search(
        &self,
        terms: &[String],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<(Arc<Product>, f64)>>;

    /// Substring match across name/brand (OR semantics across terms),
    /// ordered by review_count desc then review_rating desc.
    async fn substring_search(
        &self,
        terms: &[String],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<Arc<Product>>>;
}

/// Category table access
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<CategoryRecord>>;
}

/// External keyed store with expiry, backing the research-session flow
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn set(&self, key: &str, value: serde_json::Value, ttl_secs: u64) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
}
