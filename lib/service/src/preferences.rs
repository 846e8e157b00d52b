use crate::background::{EventHandler, PipelineState, PipelineStatus};
use crate::recommendation::RecommendationService;
use bizrec_core::{Error, Preferences, Result};
use bizrec_storage::{RelationalStore, UserId};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct RawPreferenceEvent {
    user_id: Option<UserId>,
    preferences: Option<Preferences>,
}

/// A validated preference-change event.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceEvent {
    pub user_id: UserId,
    pub preferences: Preferences,
}

impl PreferenceEvent {
    /// Decode a payload; `user_id` and `preferences` are both required and a
    /// blank string id counts as missing.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let raw: RawPreferenceEvent = serde_json::from_slice(payload)
            .map_err(|e| Error::MalformedEvent(e.to_string()))?;
        let user_id = raw
            .user_id
            .filter(|id| !matches!(id, UserId::Str(s) if s.trim().is_empty()))
            .ok_or_else(|| Error::MalformedEvent("missing user_id".to_string()))?;
        let preferences = raw
            .preferences
            .ok_or_else(|| Error::MalformedEvent(format!("missing preferences for user {}", user_id)))?;
        Ok(Self { user_id, preferences })
    }
}

/// Persists preference changes, then refreshes the matching cached response.
///
/// At-most-once: a failed step is logged with the user id and the event is
/// dropped without retry.
pub struct PreferenceUpdatePipeline {
    store: Arc<dyn RelationalStore>,
    service: Arc<RecommendationService>,
}

impl PreferenceUpdatePipeline {
    pub fn new(store: Arc<dyn RelationalStore>, service: Arc<RecommendationService>) -> Self {
        Self { store, service }
    }

    pub fn apply(&self, payload: &[u8], status: &PipelineStatus) -> Result<()> {
        status.set_state(PipelineState::Validating);
        let PreferenceEvent { user_id, preferences } = PreferenceEvent::decode(payload)?;
        let key = preferences
            .normalize()
            .map_err(|e| Error::Validation(format!("user {}: {}", user_id, e)))?
            .cache_key();

        self.store
            .update_preferences(&user_id, &preferences)
            .map_err(|e| Error::Upstream(format!("updating preferences for user {}: {}", user_id, e)))?;

        status.set_state(PipelineState::Invalidating);
        self.service
            .cache()
            .delete(&key)
            .map_err(|e| Error::Upstream(format!("invalidating {} for user {}: {}", key, user_id, e)))?;

        status.set_state(PipelineState::Recomputing);
        match self.service.recommend_for_preferences(&preferences) {
            Ok(recommendations) => {
                tracing::debug!(
                    "Refreshed {} for user {} ({} items)",
                    key,
                    user_id,
                    recommendations.items.len()
                );
                Ok(())
            }
            Err(Error::NotFound) => {
                tracing::info!("No recommendations for user {} under {}", user_id, key);
                Ok(())
            }
            Err(e) => Err(Error::Upstream(format!(
                "recomputing {} for user {}: {}",
                key, user_id, e
            ))),
        }
    }
}

impl EventHandler for Arc<PreferenceUpdatePipeline> {
    fn name(&self) -> &'static str {
        "preferences"
    }

    fn handle(&self, payload: &[u8], status: &PipelineStatus) -> Result<()> {
        self.apply(payload, status)
    }
}
