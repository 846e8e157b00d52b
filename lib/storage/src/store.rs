use ahash::AHashMap;
use bizrec_core::{BusinessFields, Error, Preferences, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// User identifier as it arrives on the wire: either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Int(i64),
    Str(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Int(id) => write!(f, "{}", id),
            UserId::Str(id) => f.write_str(id),
        }
    }
}

/// Result row of `SELECT MAX(review_count) AS max_review_count FROM Business`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaxReviewCountRow {
    /// `None` when the table is empty.
    pub max_review_count: Option<u64>,
}

/// The slice of the relational store the recommender depends on.
///
/// Backend failures surface as `Error::Upstream`.
pub trait RelationalStore: Send + Sync {
    /// Largest review count across all businesses.
    fn max_review_count(&self) -> Result<MaxReviewCountRow>;

    /// `UPDATE Users SET preferences = $1 WHERE id = $2`
    fn update_preferences(&self, user_id: &UserId, preferences: &Preferences) -> Result<()>;
}

/// In-memory [`RelationalStore`].
///
/// Reads and writes can be made to fail on demand, which the pipelines'
/// tests use to exercise upstream errors.
#[derive(Default)]
pub struct MemoryStore {
    review_counts: RwLock<AHashMap<String, u64>>,
    preferences: RwLock<AHashMap<UserId, Preferences>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a business row.
    pub fn upsert_business(&self, business: &BusinessFields) {
        self.review_counts
            .write()
            .insert(business.business_id.clone(), business.review_count);
    }

    pub fn preferences(&self, user_id: &UserId) -> Option<Preferences> {
        self.preferences.read().get(user_id).cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl RelationalStore for MemoryStore {
    fn max_review_count(&self) -> Result<MaxReviewCountRow> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Upstream("relational store unavailable".to_string()));
        }
        Ok(MaxReviewCountRow {
            max_review_count: self.review_counts.read().values().copied().max(),
        })
    }

    fn update_preferences(&self, user_id: &UserId, preferences: &Preferences) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Upstream("relational store unavailable".to_string()));
        }
        self.preferences
            .write()
            .insert(user_id.clone(), preferences.clone());
        Ok(())
    }
}
