//! Weighted score fusion for hybrid search.

use std::collections::HashMap;

use crate::types::{HybridSearchConfig, RetrievalResult, SearchType};

/// Merge semantic and keyword results into one ranked list.
///
/// Semantic results enter the map at `score * semantic_weight` and keep their
/// search type. Keyword results either add `score * keyword_weight` to an
/// existing entry (marking it hybrid) or enter on their own at
/// `score * keyword_weight`, marked hybrid. The merge is keyed by chunk ID, so
/// the same chunk surfaced by both paths fuses into a single entry, and the
/// outcome does not depend on which list is merged first.
pub fn fuse(
    semantic: Vec<RetrievalResult>,
    keyword: Vec<RetrievalResult>,
    config: &HybridSearchConfig,
    top_k: usize,
) -> Vec<RetrievalResult> {
    let mut merged: HashMap<String, RetrievalResult> = HashMap::new();

    for mut result in semantic {
        result.score = (result.score * config.semantic_weight).clamp(0.0, 1.0);
        merged.insert(result.id.clone(), result);
    }

    for mut result in keyword {
        let weighted = result.score * config.keyword_weight;
        match merged.get_mut(&result.id) {
            Some(existing) => {
                existing.score = (existing.score + weighted).clamp(0.0, 1.0);
                existing.search_type = SearchType::Hybrid;
            }
            None => {
                result.score = weighted.clamp(0.0, 1.0);
                result.search_type = SearchType::Hybrid;
                merged.insert(result.id.clone(), result);
            }
        }
    }

    let mut results: Vec<RetrievalResult> = merged.into_values().collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);
    results
}
