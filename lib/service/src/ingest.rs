use crate::background::{EventHandler, PipelineState, PipelineStatus};
use bizrec_core::{
    BusinessFeatureRecord, BusinessFields, Error, FeatureCatalog, FeatureIndexBuilder,
    IndexHandle, Result,
};
use bizrec_core::query::MAX_RATING;
use bizrec_storage::CatalogPersistence;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;

/// New-business event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessEvent {
    pub businessid: String,
    pub name: String,
    pub category: String,
    pub city: String,
    pub price: String,
    pub rating: f64,
    pub review_count: u64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub url: String,
}

impl BusinessEvent {
    pub fn into_record(self) -> Result<BusinessFeatureRecord> {
        if self.businessid.trim().is_empty() {
            return Err(Error::MalformedEvent("empty businessid".to_string()));
        }
        if !self.rating.is_finite() || !(0.0..=MAX_RATING).contains(&self.rating) {
            return Err(Error::Validation(format!(
                "rating {} for business {} is outside [0, {}]",
                self.rating, self.businessid, MAX_RATING
            )));
        }
        Ok(BusinessFeatureRecord::new(BusinessFields {
            business_id: self.businessid,
            name: self.name,
            category: self.category,
            city: self.city,
            price: self.price,
            rating: self.rating,
            review_count: self.review_count,
            address: self.address,
            phone: self.phone,
            image_url: self.image_url,
            url: self.url,
        }))
    }
}

/// Appends new businesses to the catalog and republishes the index.
///
/// Never touches the response cache; cached results may lag a rebuild until
/// their TTL runs out.
pub struct IngestionPipeline {
    catalog: Mutex<FeatureCatalog>,
    builder: FeatureIndexBuilder,
    index: Arc<IndexHandle>,
    persistence: Option<CatalogPersistence>,
}

impl IngestionPipeline {
    pub fn new(catalog: FeatureCatalog, builder: FeatureIndexBuilder, index: Arc<IndexHandle>) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            builder,
            index,
            persistence: None,
        }
    }

    /// Save the catalog after every append.
    pub fn with_persistence(mut self, persistence: CatalogPersistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Build and publish an index over the current catalog.
    pub fn publish_current(&self) -> u64 {
        let snapshot = self.catalog.lock().snapshot();
        let version = snapshot.version();
        self.index.publish(self.builder.build(&snapshot));
        tracing::info!("Published feature index v{} ({} records)", version, snapshot.len());
        version
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.lock().len()
    }

    /// Decode, append, persist, rebuild, publish. Returns the new index version.
    pub fn ingest(&self, payload: &[u8], status: &PipelineStatus) -> Result<u64> {
        let event: BusinessEvent = serde_json::from_slice(payload)
            .map_err(|e| Error::MalformedEvent(e.to_string()))?;
        let record = event.into_record()?;
        let business_id = record.business_id().to_string();

        let snapshot = {
            let mut catalog = self.catalog.lock();
            catalog.append(record)?;
            status.set_state(PipelineState::Appended);
            if let Some(persistence) = &self.persistence {
                if let Err(e) = persistence.save(&catalog) {
                    tracing::error!("Failed to persist catalog after adding {}: {}", business_id, e);
                }
            }
            catalog.snapshot()
        };

        status.set_state(PipelineState::Rebuilding);
        let version = snapshot.version();
        self.index.publish(self.builder.build(&snapshot));
        tracing::info!(
            "Added business {}; published feature index v{} ({} records)",
            business_id,
            version,
            snapshot.len()
        );
        Ok(version)
    }
}

impl EventHandler for Arc<IngestionPipeline> {
    fn name(&self) -> &'static str {
        "ingestion"
    }

    fn handle(&self, payload: &[u8], status: &PipelineStatus) -> Result<()> {
        self.ingest(payload, status).map(|_| ())
    }
}
