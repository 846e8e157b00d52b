use crate::catalog::CatalogSnapshot;
use crate::tfidf::TfidfVectorizer;
use crate::vector::SparseVector;
use crate::{BusinessFeatureRecord, Error, Result};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Which similarity structures an index build produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMode {
    /// Pairwise record-to-record matrix over `feature_text`.
    Matrix,
    /// Fitted transform plus per-record vectors over `category_text`.
    QueryVector,
    #[default]
    Both,
}

impl IndexMode {
    #[inline]
    pub fn has_matrix(self) -> bool {
        matches!(self, IndexMode::Matrix | IndexMode::Both)
    }

    #[inline]
    pub fn has_query_vectors(self) -> bool {
        matches!(self, IndexMode::QueryVector | IndexMode::Both)
    }
}

impl std::str::FromStr for IndexMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "matrix" => Ok(IndexMode::Matrix),
            "query-vector" | "query_vector" | "queryvector" => Ok(IndexMode::QueryVector),
            "both" => Ok(IndexMode::Both),
            other => Err(Error::Validation(format!("unknown index mode: {}", other))),
        }
    }
}

/// Configuration for index builds
#[derive(Debug, Clone, Default)]
pub struct IndexConfig {
    pub mode: IndexMode,
}

/// Address of a record inside one specific index snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPosition {
    version: u64,
    offset: usize,
}

impl IndexPosition {
    #[inline]
    pub fn new(version: u64, offset: usize) -> Self {
        Self { version, offset }
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Dense symmetric N x N cosine similarity matrix, row-major.
#[derive(Debug, Clone, Default)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Pairwise dot products of L2-normalized rows.
    fn from_rows(rows: &[SparseVector]) -> Self {
        let n = rows.len();
        if n == 0 {
            return Self::default();
        }
        let mut values = vec![0.0f32; n * n];
        values.par_chunks_mut(n).enumerate().for_each(|(i, out)| {
            let row = &rows[i];
            for (j, cell) in out.iter_mut().enumerate() {
                *cell = row.dot(&rows[j]);
            }
        });
        Self { n, values }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    #[inline]
    fn row(&self, offset: usize) -> &[f32] {
        &self.values[offset * self.n..(offset + 1) * self.n]
    }
}

#[derive(Debug, Clone, Default)]
struct QueryVectors {
    vectorizer: TfidfVectorizer,
    vectors: Vec<SparseVector>,
}

/// Immutable similarity snapshot over one catalog version.
///
/// Built once, published through an [`IndexHandle`], never mutated. Every
/// offset handed out is tied to this snapshot's version and checked on use.
#[derive(Debug)]
pub struct FeatureIndex {
    version: u64,
    mode: IndexMode,
    records: Arc<[BusinessFeatureRecord]>,
    matrix: Option<SimilarityMatrix>,
    query: Option<QueryVectors>,
}

impl FeatureIndex {
    /// Sentinel for an empty catalog: every query yields no matches.
    pub fn empty(version: u64, mode: IndexMode) -> Self {
        Self {
            version,
            mode,
            records: Arc::from(Vec::new()),
            matrix: mode.has_matrix().then(SimilarityMatrix::default),
            query: mode.has_query_vectors().then(QueryVectors::default),
        }
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn mode(&self) -> IndexMode {
        self.mode
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &[BusinessFeatureRecord] {
        &self.records
    }

    /// Position of `offset` in this snapshot.
    #[inline]
    pub fn position(&self, offset: usize) -> IndexPosition {
        IndexPosition::new(self.version, offset)
    }

    pub fn record(&self, position: IndexPosition) -> Result<&BusinessFeatureRecord> {
        let offset = self.check(position)?;
        Ok(&self.records[offset])
    }

    /// Similarity of the record at `position` against every record, in catalog order.
    pub fn similarity_row(&self, position: IndexPosition) -> Result<&[f32]> {
        let matrix = self.matrix.as_ref().ok_or(Error::ModeUnavailable("matrix"))?;
        let offset = self.check(position)?;
        if offset >= matrix.dim() {
            return Err(self.stale(position));
        }
        Ok(matrix.row(offset))
    }

    pub fn vectorizer(&self) -> Result<&TfidfVectorizer> {
        self.query
            .as_ref()
            .map(|q| &q.vectorizer)
            .ok_or(Error::ModeUnavailable("query-vector"))
    }

    pub fn record_vector(&self, position: IndexPosition) -> Result<&SparseVector> {
        let query = self.query.as_ref().ok_or(Error::ModeUnavailable("query-vector"))?;
        let offset = self.check(position)?;
        query.vectors.get(offset).ok_or_else(|| self.stale(position))
    }

    fn check(&self, position: IndexPosition) -> Result<usize> {
        if position.version != self.version || position.offset >= self.records.len() {
            return Err(self.stale(position));
        }
        Ok(position.offset)
    }

    fn stale(&self, position: IndexPosition) -> Error {
        Error::Consistency {
            offset: position.offset,
            position_version: position.version,
            index_version: self.version,
            len: self.records.len(),
        }
    }
}

/// Builds a [`FeatureIndex`] from a catalog snapshot. Always a full rebuild.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndexBuilder {
    config: IndexConfig,
}

impl FeatureIndexBuilder {
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn mode(&self) -> IndexMode {
        self.config.mode
    }

    pub fn build(&self, snapshot: &CatalogSnapshot) -> FeatureIndex {
        let mode = self.config.mode;
        if snapshot.is_empty() {
            return FeatureIndex::empty(snapshot.version(), mode);
        }

        let start = Instant::now();
        let records = Arc::clone(snapshot.records());

        let matrix = mode.has_matrix().then(|| {
            let texts: Vec<&str> = records.iter().map(|r| r.feature_text()).collect();
            let (_, rows) = TfidfVectorizer::fit_transform(&texts);
            SimilarityMatrix::from_rows(&rows)
        });

        let query = mode.has_query_vectors().then(|| {
            let texts: Vec<&str> = records.iter().map(|r| r.category_text()).collect();
            let (vectorizer, vectors) = TfidfVectorizer::fit_transform(&texts);
            QueryVectors { vectorizer, vectors }
        });

        tracing::debug!(
            "Built feature index v{} over {} records in {:?}",
            snapshot.version(),
            records.len(),
            start.elapsed()
        );

        FeatureIndex {
            version: snapshot.version(),
            mode,
            records,
            matrix,
            query,
        }
    }
}

/// Atomically swappable reference to the current [`FeatureIndex`].
///
/// Readers clone the `Arc` and keep their snapshot for the whole request;
/// publishing only replaces the pointer.
#[derive(Debug, Default)]
pub struct IndexHandle {
    current: RwLock<Option<Arc<FeatureIndex>>>,
}

impl IndexHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: FeatureIndex) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(index))),
        }
    }

    /// Replace the current snapshot, returning the previous one.
    pub fn publish(&self, index: FeatureIndex) -> Option<Arc<FeatureIndex>> {
        let index = Arc::new(index);
        self.current.write().replace(index)
    }

    /// The current snapshot, or `IndexNotLoaded` before the first publish.
    pub fn load(&self) -> Result<Arc<FeatureIndex>> {
        self.current.read().clone().ok_or(Error::IndexNotLoaded)
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FeatureCatalog;
    use crate::testing::record;

    fn catalog() -> FeatureCatalog {
        let mut catalog = FeatureCatalog::new();
        catalog.append(record("a", "Pizza", "Boston", "$$", 4.0, 100)).unwrap();
        catalog.append(record("b", "Pizza", "Boston", "$$", 4.0, 110)).unwrap();
        catalog.append(record("c", "Sushi", "Denver", "$$$$", 2.0, 900)).unwrap();
        catalog
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let index = FeatureIndexBuilder::default().build(&catalog().snapshot());
        assert_eq!(index.len(), 3);
        for i in 0..3 {
            let row = index.similarity_row(index.position(i)).unwrap();
            assert!((row[i] - 1.0).abs() < 1e-5);
            for j in 0..3 {
                let other = index.similarity_row(index.position(j)).unwrap();
                assert!((row[j] - other[i]).abs() < 1e-6);
            }
        }
        let row = index.similarity_row(index.position(0)).unwrap();
        assert!(row[1] > row[2]);
    }

    #[test]
    fn test_stale_position_rejected() {
        let index = FeatureIndexBuilder::default().build(&catalog().snapshot());
        let err = index.similarity_row(IndexPosition::new(index.version() + 1, 0)).unwrap_err();
        assert!(matches!(err, Error::Consistency { .. }));

        let err = index.record(index.position(3)).unwrap_err();
        assert!(matches!(err, Error::Consistency { offset: 3, len: 3, .. }));
    }

    #[test]
    fn test_mode_without_structure() {
        let builder = FeatureIndexBuilder::new(IndexConfig { mode: IndexMode::QueryVector });
        let index = builder.build(&catalog().snapshot());
        assert!(matches!(
            index.similarity_row(index.position(0)),
            Err(Error::ModeUnavailable(_))
        ));
        assert!(index.vectorizer().is_ok());
        assert!(index.record_vector(index.position(2)).is_ok());
    }

    #[test]
    fn test_empty_catalog_sentinel() {
        let index = FeatureIndexBuilder::default().build(&FeatureCatalog::new().snapshot());
        assert!(index.is_empty());
        assert_eq!(index.version(), 0);
        assert_eq!(index.vectorizer().unwrap().vocabulary_size(), 0);
    }

    #[test]
    fn test_handle_publish_swaps_snapshot() {
        let handle = IndexHandle::new();
        assert!(matches!(handle.load(), Err(Error::IndexNotLoaded)));

        let mut catalog = catalog();
        handle.publish(FeatureIndexBuilder::default().build(&catalog.snapshot()));
        let old = handle.load().unwrap();

        catalog.append(record("d", "Bar", "Austin", "$", 3.0, 5)).unwrap();
        let previous = handle.publish(FeatureIndexBuilder::default().build(&catalog.snapshot()));

        assert!(Arc::ptr_eq(&previous.unwrap(), &old));
        assert_eq!(old.len(), 3);
        assert_eq!(handle.load().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_index_mode() {
        assert_eq!("matrix".parse::<IndexMode>().unwrap(), IndexMode::Matrix);
        assert_eq!("Query-Vector".parse::<IndexMode>().unwrap(), IndexMode::QueryVector);
        assert!("hnsw".parse::<IndexMode>().is_err());
    }
}
