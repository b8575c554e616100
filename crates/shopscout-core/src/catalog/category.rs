//! Category name resolution against a catalog snapshot

use super::memory::trigram_similarity;
use super::{CategoryRecord, CategoryStore};
use crate::error::Result;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Minimum fuzzy similarity for a category name match
const FUZZY_CUTOFF: f64 = 0.4;

/// A fuzzy match whose name is more than twice as long as the query is
/// treated as an unrelated broad category, not a match
const MAX_LENGTH_RATIO: usize = 2;

/// Catch-all category name that must never become a filter
const UNCATEGORIZED: &str = "기타";

/// Resolves a free-text category name to a catalog category id.
///
/// Holds a process-lifetime read-only snapshot of `{id, name, parent_id}`
/// rows, loaded on first use. Concurrent first-callers may each trigger a
/// load; the race is benign (idempotent, last-writer-wins snapshot).
pub struct CategoryResolver {
    store: Arc<dyn CategoryStore>,
    snapshot: RwLock<Option<Arc<Vec<CategoryRecord>>>>,
}

impl CategoryResolver {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self {
            store,
            snapshot: RwLock::new(None),
        }
    }

    /// Populate the snapshot. Safe to call more than once.
    pub async fn warm(&self) -> Result<()> {
        self.load_snapshot().await?;
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Arc<Vec<CategoryRecord>>> {
        if let Ok(guard) = self.snapshot.read() {
            if let Some(ref snapshot) = *guard {
                return Ok(Arc::clone(snapshot));
            }
        }

        let records = Arc::new(self.store.list_all().await?);
        if let Ok(mut guard) = self.snapshot.write() {
            *guard = Some(Arc::clone(&records));
        }
        tracing::debug!("Loaded {} categories into resolver snapshot", records.len());
        Ok(records)
    }

    /// Resolve a category name to an id.
    ///
    /// Exact case-insensitive match first, then fuzzy similarity with
    /// [`FUZZY_CUTOFF`]. `None` means "do not filter by category", not an
    /// error: the catch-all name and unmatched names both land here.
    pub async fn resolve(&self, category_name: &str) -> Result<Option<i64>> {
        let query = category_name.trim();
        if query.is_empty() || query == UNCATEGORIZED {
            return Ok(None);
        }

        let categories = self.load_snapshot().await?;
        let query_lower = query.to_lowercase();

        for category in categories.iter() {
            if category.name.to_lowercase() == query_lower {
                return Ok(Some(category.id));
            }
        }

        let mut best: Option<(&CategoryRecord, f64)> = None;
        for category in categories.iter() {
            let similarity = trigram_similarity(&query_lower, &category.name.to_lowercase());
            if similarity < FUZZY_CUTOFF {
                continue;
            }
            if best.map(|(_, s)| similarity > s).unwrap_or(true) {
                best = Some((category, similarity));
            }
        }

        match best {
            Some((category, similarity)) => {
                if category.name.chars().count() > query.chars().count() * MAX_LENGTH_RATIO {
                    tracing::debug!(
                        "Rejecting fuzzy category match '{}' for '{}': name too long",
                        category.name,
                        query
                    );
                    return Ok(None);
                }
                tracing::debug!(
                    "Fuzzy-resolved category '{}' to '{}' ({:.2})",
                    query,
                    category.name,
                    similarity
                );
                Ok(Some(category.id))
            }
            None => Ok(None),
        }
    }

    /// A category id plus all of its recursively resolved descendant ids
    pub async fn subtree_ids(&self, category_id: i64) -> Result<Vec<i64>> {
        let categories = self.load_snapshot().await?;

        let mut ids = vec![category_id];
        let mut queue = VecDeque::from([category_id]);

        while let Some(current) = queue.pop_front() {
            for category in categories.iter() {
                if category.parent_id == Some(current) && !ids.contains(&category.id) {
                    ids.push(category.id);
                    queue.push_back(category.id);
                }
            }
        }

        Ok(ids)
    }

    /// Resolve a name straight to its subtree id set, the shape the search
    /// filter wants. `None` means no category constraint.
    pub async fn resolve_subtree(&self, category_name: &str) -> Result<Option<Vec<i64>>> {
        match self.resolve(category_name).await? {
            Some(id) => Ok(Some(self.subtree_ids(id).await?)),
            None => Ok(None),
        }
    }
}
