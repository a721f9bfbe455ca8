pub mod store;

pub use store::{CacheError, CacheStore, CachedResponse};
