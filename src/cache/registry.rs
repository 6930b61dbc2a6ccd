//! Coordinated shutdown for cache sweep tasks
//!
//! Every live cache registers here so process teardown can cancel and await
//! all sweep tasks in one place instead of leaving dangling background work.
//! The registry is an explicit object handed to whatever constructs caches;
//! membership is weak and best-effort, so a cache dropped without
//! unregistering is simply skipped.

use crate::cache::expiring::CacheInner;
use crate::cache::ExpiringCache;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, Weak};

/// Shutdown surface the registry needs from a cache, erased over the value
/// type
#[async_trait]
pub trait ManagedCache: Send + Sync {
    async fn shutdown(&self);
}

#[async_trait]
impl<V> ManagedCache for CacheInner<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn shutdown(&self) {
        CacheInner::shutdown(self).await;
    }
}

/// Weak membership set of live caches
#[derive(Default)]
pub struct CacheRegistry {
    caches: Mutex<Vec<Weak<dyn ManagedCache>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cache to the registry
    pub fn register<V>(&self, cache: &ExpiringCache<V>)
    where
        V: Clone + Send + Sync + 'static,
    {
        let erased: Arc<dyn ManagedCache> = cache.inner.clone();
        self.caches.lock().unwrap().push(Arc::downgrade(&erased));
    }

    /// Removes a cache from the registry. Absence is not an error.
    pub fn unregister<V>(&self, cache: &ExpiringCache<V>)
    where
        V: Clone + Send + Sync + 'static,
    {
        let target = Arc::as_ptr(&cache.inner) as *const ();
        self.caches
            .lock()
            .unwrap()
            .retain(|weak| weak.as_ptr() as *const () != target);
    }

    /// Number of registered caches still alive
    pub fn live_count(&self) -> usize {
        let mut caches = self.caches.lock().unwrap();
        caches.retain(|weak| weak.strong_count() > 0);
        caches.len()
    }

    /// Cancels and awaits every live cache's sweep task.
    ///
    /// Dropped caches and already-stopped tasks are tolerated silently.
    /// Safe to call more than once.
    pub async fn shutdown_all(&self) {
        let live: Vec<Arc<dyn ManagedCache>> = {
            let mut caches = self.caches.lock().unwrap();
            caches.drain(..).filter_map(|weak| weak.upgrade()).collect()
        };
        tracing::debug!("Shutting down {} cache sweep task(s)", live.len());
        for cache in live {
            cache.shutdown().await;
        }
    }
}
