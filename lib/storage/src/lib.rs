pub mod cache;
pub mod persistence;
pub mod store;

pub use cache::{CacheStore, MemoryCacheStore, ResponseCache, DEFAULT_TTL};
pub use persistence::CatalogPersistence;
pub use store::{MaxReviewCountRow, MemoryStore, RelationalStore, UserId};
