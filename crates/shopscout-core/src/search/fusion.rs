//! Score fusion for vector and keyword candidates

use super::{ProductCandidate, KEYWORD_WEIGHT, VECTOR_WEIGHT};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Merge vector and keyword candidate lists by product code (union).
///
/// A code present in both lists keeps both signals; a missing signal stays 0.
/// `combined_score = 0.7 * vector_score + 0.3 * keyword_score`. The result is
/// ordered by the full tie-break chain of [`sort_candidates`].
pub fn fuse_results(
    vector_results: Vec<ProductCandidate>,
    keyword_results: Vec<ProductCandidate>,
) -> Vec<ProductCandidate> {
    let mut by_code: HashMap<String, ProductCandidate> = HashMap::new();

    for candidate in vector_results {
        by_code.insert(candidate.product.code.clone(), candidate);
    }

    for candidate in keyword_results {
        match by_code.get_mut(&candidate.product.code) {
            Some(existing) => existing.keyword_score = candidate.keyword_score,
            None => {
                by_code.insert(candidate.product.code.clone(), candidate);
            }
        }
    }

    let mut fused: Vec<ProductCandidate> = by_code
        .into_values()
        .map(|mut candidate| {
            candidate.combined_score =
                VECTOR_WEIGHT * candidate.vector_score + KEYWORD_WEIGHT * candidate.keyword_score;
            candidate
        })
        .collect();

    sort_candidates(&mut fused);
    fused
}

/// Total-order sort: combined_score desc, review_count desc, review_rating
/// desc (missing rating counts as 0), finally product code for stability
/// across runs.
pub fn sort_candidates(candidates: &mut [ProductCandidate]) {
    candidates.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.product.review_count.cmp(&a.product.review_count))
            .then_with(|| {
                let ra = a.product.review_rating.unwrap_or(0.0);
                let rb = b.product.review_rating.unwrap_or(0.0);
                rb.partial_cmp(&ra).unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.product.code.cmp(&b.product.code))
    });
}

/// Append fallback candidates whose product code is not already fused.
///
/// Fallback never overrides a fused score and never re-sorts the fused
/// prefix; its entries keep their review-ordered position at the tail.
pub fn merge_fallback(fused: &mut Vec<ProductCandidate>, fallback: Vec<ProductCandidate>) {
    let mut existing: std::collections::HashSet<String> =
        fused.iter().map(|c| c.product.code.clone()).collect();

    for candidate in fallback {
        if existing.insert(candidate.product.code.clone()) {
            fused.push(candidate);
        }
    }
}
