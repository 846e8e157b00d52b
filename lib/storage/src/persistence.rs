use anyhow::Context;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use bizrec_core::{BusinessFeatureRecord, Error, FeatureCatalog, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

const CATALOG_FILENAME: &str = "catalog.bin";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct CatalogFileRef<'a> {
    format: u32,
    records: &'a [BusinessFeatureRecord],
}

#[derive(Deserialize)]
struct CatalogFile {
    format: u32,
    records: Vec<BusinessFeatureRecord>,
}

/// Catalog dump under the data directory, replaced atomically on each save.
///
/// Only source fields are written; derived text and the similarity index are
/// rebuilt on load.
#[derive(Debug, Clone)]
pub struct CatalogPersistence {
    path: PathBuf,
}

impl CatalogPersistence {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            path: data_dir.as_ref().join(CATALOG_FILENAME),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, catalog: &FeatureCatalog) -> Result<()> {
        self.write(catalog.records())
            .map_err(|e| Error::Persistence(format!("{:#}", e)))
    }

    /// Load the saved catalog, or `None` if nothing has been saved yet.
    pub fn load(&self) -> Result<Option<FeatureCatalog>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let records = self
            .read()
            .map_err(|e| Error::Persistence(format!("{:#}", e)))?;
        Ok(Some(FeatureCatalog::from_records(records)))
    }

    fn write(&self, records: &[BusinessFeatureRecord]) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let data = bincode::serialize(&CatalogFileRef {
            format: FORMAT_VERSION,
            records,
        })
        .context("serializing catalog")?;

        AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&data))
            .with_context(|| format!("writing {}", self.path.display()))?;

        tracing::debug!("Saved {} records to {:?}", records.len(), self.path);
        Ok(())
    }

    fn read(&self) -> anyhow::Result<Vec<BusinessFeatureRecord>> {
        let data = std::fs::read(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let file: CatalogFile = bincode::deserialize(&data).context("decoding catalog")?;
        if file.format != FORMAT_VERSION {
            anyhow::bail!("unsupported catalog format {}", file.format);
        }
        Ok(file.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizrec_core::BusinessFields;
    use tempfile::tempdir;

    fn record(id: &str, category: &str) -> BusinessFeatureRecord {
        BusinessFeatureRecord::new(BusinessFields {
            business_id: id.to_string(),
            name: id.to_string(),
            category: category.to_string(),
            city: "Boston".to_string(),
            price: "$$".to_string(),
            rating: 4.5,
            review_count: 120,
            address: "1 Main St".to_string(),
            phone: String::new(),
            image_url: String::new(),
            url: String::new(),
        })
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempdir().unwrap();
        let persistence = CatalogPersistence::new(dir.path());
        assert!(persistence.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let persistence = CatalogPersistence::new(dir.path().join("nested"));

        let mut catalog = FeatureCatalog::new();
        catalog.append(record("a", "Cafe")).unwrap();
        catalog.append(record("b", "Coffee & Tea, Bakeries")).unwrap();
        persistence.save(&catalog).unwrap();

        catalog.append(record("c", "Bar")).unwrap();
        persistence.save(&catalog).unwrap();

        let restored = persistence.load().unwrap().unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.records(), catalog.records());
        assert_eq!(restored.records()[1].category_text(), "Coffee & Tea Bakeries");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let persistence = CatalogPersistence::new(dir.path());
        std::fs::write(persistence.path(), b"garbage").unwrap();
        assert!(matches!(persistence.load(), Err(Error::Persistence(_))));
    }
}
