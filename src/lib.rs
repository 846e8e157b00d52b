//! # bizrec
//!
//! Business recommendations from declared category and city preferences.
//!
//! bizrec keeps a TF-IDF similarity index over an append-only business
//! catalog, answers structured and free-text recommendation queries through a
//! TTL response cache, and runs two background pipelines: one rebuilds the
//! index as businesses arrive, the other refreshes cached results when a
//! user's preferences change.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! bizrec --http-port 8080 --data-dir ./data
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use bizrec::prelude::*;
//! use std::sync::Arc;
//!
//! let index = Arc::new(IndexHandle::new());
//! let store = Arc::new(MemoryStore::new());
//! let service = Arc::new(RecommendationService::new(
//!     index.clone(),
//!     Arc::new(MemoryCacheStore::new()),
//!     store.clone(),
//!     ServiceConfig::default(),
//! ));
//!
//! // Feed businesses through the ingestion pipeline
//! let ingestion = Arc::new(IngestionPipeline::new(
//!     FeatureCatalog::new(),
//!     FeatureIndexBuilder::default(),
//!     index,
//! ));
//! let queue = Arc::new(EventQueue::new());
//! let consumer = spawn_consumer(queue.clone(), ingestion).unwrap();
//! queue.publish(br#"{"businessid": "b1", "name": "Joe's", "category": "Pizza",
//!     "city": "Boston", "price": "$$", "rating": 4.5, "review_count": 120}"#.to_vec());
//! consumer.shutdown();
//!
//! let prefs = Preferences { category: vec!["Pizza".into()], city: "Boston".into() };
//! let result = service.recommend_for_preferences(&prefs);
//! ```
//!
//! ## Crate Structure
//!
//! - `bizrec-core` - Records, catalog, TF-IDF index, ranking, query keys
//! - `bizrec-storage` - Response cache, relational store interface, catalog persistence
//! - `bizrec-service` - Recommendation service and event pipelines
//! - `bizrec-api` - REST API

// Re-export core types
pub use bizrec_core::{
    BusinessFeatureRecord, BusinessFields, CacheKey, FeatureCatalog, FeatureIndex,
    FeatureIndexBuilder, FilterQuery, IndexConfig, IndexHandle, IndexMode, Preferences,
    RecommendationItem, SimilarityEngine, Error, Result, StatusCode,
};

// Re-export storage
pub use bizrec_storage::{
    CacheStore, CatalogPersistence, MemoryCacheStore, MemoryStore, RelationalStore,
    ResponseCache, UserId,
};

// Re-export service
pub use bizrec_service::{
    spawn_consumer, ConsumerHandle, EventQueue, EventSource, IngestionPipeline,
    PipelineState, PreferenceUpdatePipeline, RecommendationService, Recommendations,
    ServiceConfig,
};

// Re-export API
pub use bizrec_api::{ApiState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BusinessFeatureRecord, BusinessFields, FeatureCatalog, FeatureIndexBuilder,
        FilterQuery, IndexHandle, Preferences, RecommendationItem, Error, Result,
        MemoryCacheStore, MemoryStore,
        spawn_consumer, EventQueue, IngestionPipeline, PreferenceUpdatePipeline,
        RecommendationService, ServiceConfig,
        RestApi,
    };
}
