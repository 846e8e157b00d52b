use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of the star rating scale.
pub const MAX_RATING: f64 = 5.0;

const FILTER_NAMESPACE: &str = "filter";
const PREFERENCE_NAMESPACE: &str = "recommendations";

/// Structured query: filter the catalog, then rank by similarity to the first match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterQuery {
    pub category: String,
    pub city: String,
    pub price: String,
    pub min_rating: f64,
    #[serde(default)]
    pub min_review_count: u64,
}

impl FilterQuery {
    /// Validate and canonicalize. `min_rating` must be finite and within `[0, 5]`.
    pub fn normalize(&self) -> Result<NormalizedFilter> {
        if !self.min_rating.is_finite() || !(0.0..=MAX_RATING).contains(&self.min_rating) {
            return Err(Error::Validation(format!(
                "min_rating must be between 0 and {}, got {}",
                MAX_RATING, self.min_rating
            )));
        }
        Ok(NormalizedFilter {
            category: normalize_text(&self.category),
            city: normalize_text(&self.city),
            price: normalize_text(&self.price),
            min_rating: (self.min_rating * 100.0).round() / 100.0,
            min_review_count: self.min_review_count,
        })
    }
}

/// Canonical form of a [`FilterQuery`]; the same value drives the cache key and the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFilter {
    pub category: String,
    pub city: String,
    pub price: String,
    /// Rounded to two decimals.
    pub min_rating: f64,
    pub min_review_count: u64,
}

impl NormalizedFilter {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey(format!(
            "{}:{}|{}|{}|{:.2}|{}",
            FILTER_NAMESPACE,
            escape(&self.category),
            escape(&self.city),
            escape(&self.price),
            self.min_rating,
            self.min_review_count
        ))
    }
}

/// A user's declared preferences; also the free-text query shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub category: Vec<String>,
    pub city: String,
}

pub type PreferenceQuery = Preferences;

impl Preferences {
    /// Requires at least one non-blank category term and a non-blank city.
    pub fn normalize(&self) -> Result<NormalizedPreferences> {
        let mut terms: Vec<String> = self
            .category
            .iter()
            .map(|t| normalize_text(t))
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Err(Error::Validation(
                "at least one category is required".to_string(),
            ));
        }
        terms.sort();
        terms.dedup();

        let city = normalize_text(&self.city);
        if city.is_empty() {
            return Err(Error::Validation("city is required".to_string()));
        }
        Ok(NormalizedPreferences { terms, city })
    }
}

/// Canonical preferences: sorted, de-duplicated lower-case terms and city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPreferences {
    pub terms: Vec<String>,
    pub city: String,
}

impl NormalizedPreferences {
    /// Terms joined into the text fed to the vectorizer.
    pub fn query_text(&self) -> String {
        self.terms.join(" ")
    }

    pub fn cache_key(&self) -> CacheKey {
        let terms: Vec<String> = self.terms.iter().map(|t| escape(t)).collect();
        CacheKey(format!(
            "{}:{}:{}",
            PREFERENCE_NAMESPACE,
            terms.join(" "),
            escape(&self.city)
        ))
    }
}

/// Response cache key. Structured and free-text keys never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lower-case and collapse runs of whitespace to one space.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '%' => out.push_str("%25"),
            '|' => out.push_str("%7C"),
            ':' => out.push_str("%3A"),
            _ => out.push(c),
        }
    }
    out
}
