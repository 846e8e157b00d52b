use bizrec_core::{
    CacheKey, Error, FilterQuery, IndexHandle, Preferences, RecommendationItem, Result,
    SimilarityEngine, FREE_TEXT_TOP_K, STRUCTURED_TOP_K,
};
use bizrec_storage::{CacheStore, RelationalStore, ResponseCache, DEFAULT_TTL};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the query path
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub structured_top_k: usize,
    pub free_text_top_k: usize,
    pub cache_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            structured_top_k: STRUCTURED_TOP_K,
            free_text_top_k: FREE_TEXT_TOP_K,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

/// A ranked result list and whether it was served from the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub items: Vec<RecommendationItem>,
    pub cached: bool,
}

/// Query orchestration: normalize, consult the cache, rank on miss, populate.
pub struct RecommendationService {
    index: Arc<IndexHandle>,
    cache: ResponseCache<Arc<dyn CacheStore>>,
    store: Arc<dyn RelationalStore>,
    config: ServiceConfig,
    engine_invocations: AtomicU64,
}

impl RecommendationService {
    pub fn new(
        index: Arc<IndexHandle>,
        cache_store: Arc<dyn CacheStore>,
        store: Arc<dyn RelationalStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            index,
            cache: ResponseCache::with_ttl(cache_store, config.cache_ttl),
            store,
            config,
            engine_invocations: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    #[inline]
    pub fn cache(&self) -> &ResponseCache<Arc<dyn CacheStore>> {
        &self.cache
    }

    #[inline]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Number of times a query reached the ranking engine.
    pub fn engine_invocations(&self) -> u64 {
        self.engine_invocations.load(Ordering::Relaxed)
    }

    /// Structured recommendations: filter, pivot on the first match, rank by similarity.
    pub fn recommend(&self, query: &FilterQuery) -> Result<Recommendations> {
        let filter = query.normalize()?;
        let key = filter.cache_key();
        if let Some(items) = self.cache.get(&key)? {
            return Ok(Recommendations { items, cached: true });
        }

        let index = self.index.load()?;
        let max_review_count = self
            .store
            .max_review_count()?
            .max_review_count
            .unwrap_or(1);

        self.engine_invocations.fetch_add(1, Ordering::Relaxed);
        let items = SimilarityEngine::rank_filtered(
            &index,
            &filter,
            max_review_count,
            self.config.structured_top_k,
        )
        .map_err(log_consistency)?;
        self.finish(&key, items)
    }

    /// Free-text recommendations from a list of category terms and a city.
    pub fn recommend_for_preferences(&self, preferences: &Preferences) -> Result<Recommendations> {
        let normalized = preferences.normalize()?;
        let key = normalized.cache_key();
        if let Some(items) = self.cache.get(&key)? {
            return Ok(Recommendations { items, cached: true });
        }

        let index = self.index.load()?;
        self.engine_invocations.fetch_add(1, Ordering::Relaxed);
        let items =
            SimilarityEngine::rank_terms(&index, &normalized, self.config.free_text_top_k)
                .map_err(log_consistency)?;
        self.finish(&key, items)
    }

    fn finish(&self, key: &CacheKey, items: Vec<RecommendationItem>) -> Result<Recommendations> {
        if items.is_empty() {
            return Err(Error::NotFound);
        }
        if let Err(e) = self.cache.set(key, &items) {
            tracing::warn!("Failed to cache recommendations for {}: {}", key, e);
        }
        Ok(Recommendations { items, cached: false })
    }
}

fn log_consistency(e: Error) -> Error {
    if matches!(e, Error::Consistency { .. }) {
        tracing::error!("{}", e);
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizrec_core::{
        BusinessFeatureRecord, BusinessFields, FeatureCatalog, FeatureIndexBuilder, StatusCode,
    };
    use bizrec_storage::{MemoryCacheStore, MemoryStore};

    fn record(id: &str, category: &str, city: &str, price: &str, rating: f64, reviews: u64) -> BusinessFeatureRecord {
        BusinessFeatureRecord::new(BusinessFields {
            business_id: id.to_string(),
            name: id.to_string(),
            category: category.to_string(),
            city: city.to_string(),
            price: price.to_string(),
            rating,
            review_count: reviews,
            address: String::new(),
            phone: String::new(),
            image_url: String::new(),
            url: String::new(),
        })
    }

    struct Fixture {
        service: RecommendationService,
        cache: Arc<MemoryCacheStore>,
        store: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let catalog = FeatureCatalog::from_records(vec![
            record("a", "Pizza", "Boston", "$$", 4.5, 100),
            record("b", "Pizza", "Boston", "$$", 4.0, 80),
            record("c", "Italian, Pizza", "Boston", "$$$", 4.0, 30),
            record("d", "Sushi", "Boston", "$$", 3.0, 10),
        ]);
        let store = Arc::new(MemoryStore::new());
        for r in catalog.records() {
            store.upsert_business(r.fields());
        }
        let index = Arc::new(IndexHandle::with_index(
            FeatureIndexBuilder::default().build(&catalog.snapshot()),
        ));
        let cache = Arc::new(MemoryCacheStore::new());
        let service = RecommendationService::new(
            index,
            cache.clone(),
            store.clone(),
            ServiceConfig::default(),
        );
        Fixture { service, cache, store }
    }

    fn query(min_rating: f64) -> FilterQuery {
        FilterQuery {
            category: "pizza".into(),
            city: "Boston".into(),
            price: "$$".into(),
            min_rating,
            min_review_count: 0,
        }
    }

    #[test]
    fn test_second_query_is_cached() {
        let f = fixture();
        let first = f.service.recommend(&query(4.0)).unwrap();
        assert!(!first.cached);
        assert_eq!(first.items[0].name, "b");
        assert_eq!(f.service.engine_invocations(), 1);

        let key = query(4.0).normalize().unwrap().cache_key();
        let raw = f.service.cache().get_raw(&key).unwrap().unwrap();

        let second = f.service.recommend(&query(4.0)).unwrap();
        assert!(second.cached);
        assert_eq!(second.items, first.items);
        assert_eq!(f.service.engine_invocations(), 1);
        assert_eq!(f.service.cache().get_raw(&key).unwrap().unwrap(), raw);
    }

    #[test]
    fn test_invalid_rating_touches_nothing() {
        let f = fixture();
        let err = f.service.recommend(&query(7.5)).unwrap_err();
        assert_eq!(err.status(), StatusCode::InvalidArgument);
        assert!(f.cache.is_empty());
        assert_eq!(f.service.engine_invocations(), 0);
    }

    #[test]
    fn test_no_match_is_not_found() {
        let f = fixture();
        let mut q = query(0.0);
        q.city = "Nowhere".into();
        let err = f.service.recommend(&q).unwrap_err();
        assert_eq!(err.status(), StatusCode::NotFound);
        assert!(f.cache.is_empty());
    }

    #[test]
    fn test_store_failure_is_internal() {
        let f = fixture();
        f.store.set_fail_reads(true);
        let err = f.service.recommend(&query(4.0)).unwrap_err();
        assert_eq!(err.status(), StatusCode::Internal);
    }

    #[test]
    fn test_unloaded_index_is_internal() {
        let service = RecommendationService::new(
            Arc::new(IndexHandle::new()),
            Arc::new(MemoryCacheStore::new()),
            Arc::new(MemoryStore::new()),
            ServiceConfig::default(),
        );
        let err = service.recommend(&query(4.0)).unwrap_err();
        assert!(matches!(err, Error::IndexNotLoaded));
        assert_eq!(err.status(), StatusCode::Internal);
    }

    #[test]
    fn test_preferences_ranked_and_cached() {
        let f = fixture();
        let prefs = Preferences {
            category: vec!["Italian".into(), "Pizza".into()],
            city: "boston".into(),
        };
        let out = f.service.recommend_for_preferences(&prefs).unwrap();
        assert_eq!(out.items[0].name, "c");
        assert_eq!(out.items.len(), 3);

        let key = prefs.normalize().unwrap().cache_key();
        assert_eq!(key.as_str(), "recommendations:italian pizza:boston");
        assert!(f.service.cache().get(&key).unwrap().is_some());
        assert!(f.service.recommend_for_preferences(&prefs).unwrap().cached);
    }

    #[test]
    fn test_preferences_validation() {
        let f = fixture();
        let prefs = Preferences { category: vec![], city: "Boston".into() };
        let err = f.service.recommend_for_preferences(&prefs).unwrap_err();
        assert_eq!(err.status(), StatusCode::InvalidArgument);
    }
}
