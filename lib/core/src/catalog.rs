use crate::{BusinessFeatureRecord, Error, Result};
use ahash::AHashSet;
use std::sync::Arc;

/// Append-only set of business records, in arrival order.
///
/// The catalog has a single writer (the ingestion pipeline). Readers never
/// see it directly; they work against a [`CatalogSnapshot`] frozen at index
/// build time.
#[derive(Debug, Default)]
pub struct FeatureCatalog {
    records: Vec<BusinessFeatureRecord>,
    ids: AHashSet<String>,
    version: u64,
}

impl FeatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a catalog from previously persisted records.
    ///
    /// Later duplicates of a business id are dropped.
    pub fn from_records(records: Vec<BusinessFeatureRecord>) -> Self {
        let mut catalog = Self::new();
        for record in records {
            if let Err(e) = catalog.append(record) {
                tracing::warn!("Skipping record while restoring catalog: {}", e);
            }
        }
        catalog
    }

    /// Append a record and return the new catalog version.
    pub fn append(&mut self, record: BusinessFeatureRecord) -> Result<u64> {
        if self.ids.contains(record.business_id()) {
            return Err(Error::Validation(format!(
                "business {} already exists",
                record.business_id()
            )));
        }
        self.ids.insert(record.business_id().to_string());
        self.records.push(record);
        self.version += 1;
        Ok(self.version)
    }

    #[inline]
    pub fn contains(&self, business_id: &str) -> bool {
        self.ids.contains(business_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Incremented on every append.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn records(&self) -> &[BusinessFeatureRecord] {
        &self.records
    }

    /// Freeze the current state for an index build.
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            version: self.version,
            records: self.records.as_slice().into(),
        }
    }
}

/// Immutable view of the catalog at one version.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    version: u64,
    records: Arc<[BusinessFeatureRecord]>,
}

impl CatalogSnapshot {
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn records(&self) -> &Arc<[BusinessFeatureRecord]> {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
