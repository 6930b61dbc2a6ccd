//! Short-TTL in-process caching
//!
//! Used for ad hoc memoization of resolved identifiers and other values a
//! crawl pass looks up repeatedly. See [`ExpiringCache`] for expiry
//! semantics and [`CacheRegistry`] for coordinated shutdown of the
//! background sweep tasks.

mod expiring;
mod registry;

pub use expiring::ExpiringCache;
pub use registry::{CacheRegistry, ManagedCache};
