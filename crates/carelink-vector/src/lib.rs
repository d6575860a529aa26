//! Embedding storage for CareLink: the two-tier vector cache, cosine
//! similarity and the service warm-up job.

pub mod cache;
pub mod schema;
pub mod similarity;
pub mod store;
pub mod warm;

pub use cache::{query_key, service_key, CacheEntry, VectorCache, DEFAULT_HOT_CAPACITY};
pub use similarity::cosine_similarity;
pub use warm::{content_hash, is_fresh, warm_services, WarmReport};
