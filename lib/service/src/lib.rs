//! # bizrec Service
//!
//! Query orchestration and the two background pipelines that keep the
//! feature index and the response cache in step with upstream changes.

pub mod background;
pub mod ingest;
pub mod preferences;
pub mod recommendation;

pub use background::{
    spawn_consumer, ConsumerHandle, EventHandler, EventQueue, EventSource, PipelineState,
    PipelineStats, PipelineStatus,
};
pub use ingest::{BusinessEvent, IngestionPipeline};
pub use preferences::{PreferenceEvent, PreferenceUpdatePipeline};
pub use recommendation::{RecommendationService, Recommendations, ServiceConfig};
