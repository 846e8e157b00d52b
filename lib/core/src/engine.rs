use crate::index::FeatureIndex;
use crate::query::{normalize_text, NormalizedFilter, NormalizedPreferences, MAX_RATING};
use crate::{BusinessFeatureRecord, RecommendationItem, Result};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;

/// Results returned for a structured query.
pub const STRUCTURED_TOP_K: usize = 5;
/// Results returned for a free-text query.
pub const FREE_TEXT_TOP_K: usize = 10;

/// Stateless ranking over a [`FeatureIndex`] snapshot.
///
/// An empty result means "no matches"; callers decide how to surface it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityEngine;

impl SimilarityEngine {
    /// Filter the catalog, take the first survivor as pivot and return the
    /// `k` records most similar to it (pivot excluded).
    ///
    /// Review counts are compared after normalizing by `max_review_count`;
    /// a maximum below 1 is treated as 1.
    pub fn rank_filtered(
        index: &FeatureIndex,
        filter: &NormalizedFilter,
        max_review_count: u64,
        k: usize,
    ) -> Result<Vec<RecommendationItem>> {
        let max_reviews = max_review_count.max(1) as f64;
        let min_rating = filter.min_rating / MAX_RATING;
        let min_reviews = filter.min_review_count as f64 / max_reviews;

        let pivot = index.records().iter().position(|record| {
            matches_filter(record, filter)
                && record.fields().rating / MAX_RATING >= min_rating
                && record.fields().review_count as f64 / max_reviews >= min_reviews
        });
        let Some(pivot) = pivot else {
            return Ok(Vec::new());
        };

        let row = index.similarity_row(index.position(pivot))?;
        let mut offsets: Vec<usize> = (0..row.len()).filter(|&i| i != pivot).collect();
        offsets.sort_by_key(|&i| Reverse(OrderedFloat(row[i])));
        offsets.truncate(k);

        offsets
            .into_iter()
            .map(|i| index.record(index.position(i)).map(BusinessFeatureRecord::to_item))
            .collect()
    }

    /// Score records in the requested city against the preference terms and
    /// return the top `k` with strictly positive similarity.
    pub fn rank_terms(
        index: &FeatureIndex,
        preferences: &NormalizedPreferences,
        k: usize,
    ) -> Result<Vec<RecommendationItem>> {
        let vectorizer = index.vectorizer()?;
        let query = vectorizer.transform(&preferences.query_text());
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = Vec::new();
        for (offset, record) in index.records().iter().enumerate() {
            if normalize_text(&record.fields().city) != preferences.city {
                continue;
            }
            let score = query.dot(index.record_vector(index.position(offset))?);
            if score > 0.0 {
                scored.push((offset, score));
            }
        }
        scored.sort_by_key(|&(_, score)| Reverse(OrderedFloat(score)));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, _)| index.record(index.position(i)).map(BusinessFeatureRecord::to_item))
            .collect()
    }
}

fn matches_filter(record: &BusinessFeatureRecord, filter: &NormalizedFilter) -> bool {
    let fields = record.fields();
    normalize_text(&fields.category).contains(&filter.category)
        && normalize_text(&fields.city).contains(&filter.city)
        && normalize_text(&fields.price) == filter.price
}
