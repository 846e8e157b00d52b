//! # bizrec Core
//!
//! Core library for the bizrec business recommender.
//!
//! This crate provides the fundamental data structures and algorithms:
//!
//! - [`BusinessFeatureRecord`] - A business plus the text the index vectorizes
//! - [`FeatureCatalog`] - Append-only, versioned set of records
//! - [`TfidfVectorizer`] - TF-IDF transform over feature text
//! - [`FeatureIndex`] - Immutable similarity snapshot, published via [`IndexHandle`]
//! - [`SimilarityEngine`] - Structured and free-text ranking
//! - [`FilterQuery`] / [`Preferences`] - Query shapes and their cache keys
//!
//! ## Example
//!
//! ```rust
//! use bizrec_core::{BusinessFields, BusinessFeatureRecord, FeatureCatalog, FeatureIndexBuilder,
//!                   FilterQuery, SimilarityEngine};
//!
//! let mut catalog = FeatureCatalog::new();
//! for (id, city) in [("a", "Boston"), ("b", "Boston")] {
//!     catalog.append(BusinessFeatureRecord::new(BusinessFields {
//!         business_id: id.to_string(),
//!         name: format!("Cafe {}", id),
//!         category: "Cafe".to_string(),
//!         city: city.to_string(),
//!         price: "$".to_string(),
//!         rating: 4.0,
//!         review_count: 10,
//!         address: String::new(),
//!         phone: String::new(),
//!         image_url: String::new(),
//!         url: String::new(),
//!     })).unwrap();
//! }
//!
//! let index = FeatureIndexBuilder::default().build(&catalog.snapshot());
//! let query = FilterQuery {
//!     category: "cafe".to_string(),
//!     city: "boston".to_string(),
//!     price: "$".to_string(),
//!     min_rating: 3.5,
//!     min_review_count: 0,
//! };
//! let items = SimilarityEngine::rank_filtered(&index, &query.normalize().unwrap(), 10, 5).unwrap();
//! assert_eq!(items[0].name, "Cafe b");
//! ```

pub mod catalog;
pub mod engine;
pub mod error;
pub mod index;
pub mod query;
pub mod record;
pub mod tfidf;
pub mod vector;

pub use catalog::{CatalogSnapshot, FeatureCatalog};
pub use engine::{SimilarityEngine, FREE_TEXT_TOP_K, STRUCTURED_TOP_K};
pub use error::{Error, Result, StatusCode};
pub use index::{FeatureIndex, FeatureIndexBuilder, IndexConfig, IndexHandle, IndexMode, IndexPosition};
pub use query::{CacheKey, FilterQuery, NormalizedFilter, NormalizedPreferences, PreferenceQuery, Preferences};
pub use record::{BusinessFeatureRecord, BusinessFields, RecommendationItem};
pub use tfidf::TfidfVectorizer;
pub use vector::SparseVector;
