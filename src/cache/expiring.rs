//! Expiring in-process cache with background sweeping
//!
//! Correctness never depends on the sweep: `get` lazily deletes entries
//! whose expiry has passed, so the background task is purely advisory
//! housekeeping that keeps dead entries from accumulating between reads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A cached value with its absolute expiry
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
pub(crate) enum SweeperState {
    /// No sweep task yet; one may be started lazily on the next write
    Idle,
    Running(JoinHandle<()>),
    /// Shut down for good; never restarted
    Stopped,
}

pub(crate) struct CacheInner<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    cron_interval: Duration,
    sweeper: Mutex<SweeperState>,
}

impl<V> CacheInner<V> {
    /// Deletes every entry whose expiry has passed
    fn prune_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Cancels the sweep task and awaits it, tolerating the task having
    /// already finished or been cancelled.
    pub(crate) async fn shutdown(&self) {
        let state = {
            let mut sweeper = self.sweeper.lock().unwrap();
            std::mem::replace(&mut *sweeper, SweeperState::Stopped)
        };
        if let SweeperState::Running(handle) = state {
            handle.abort();
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::warn!("Cache sweep task ended abnormally: {}", e),
            }
        }
    }
}

/// Process-local key/value cache with per-entry TTLs.
///
/// Values are cloned out on read. Safe for interleaved access from
/// concurrent tasks, but identical in-flight computations are not
/// deduplicated: two callers missing the same key will both recompute.
pub struct ExpiringCache<V> {
    pub(crate) inner: Arc<CacheInner<V>>,
}

impl<V> Clone for ExpiringCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache whose sweep task wakes every `cron_interval`.
    ///
    /// Construction never requires a running runtime: if none is current,
    /// the sweep task starts on the first `set` made inside one.
    pub fn new(cron_interval: Duration) -> Self {
        let cache = Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
                cron_interval,
                sweeper: Mutex::new(SweeperState::Idle),
            }),
        };
        cache.try_start_sweeper();
        cache
    }

    /// Returns the live value for `key`, deleting it if expired
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.inner.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Inserts `value` under `key`, establishing or overwriting its expiry
    /// as now + `ttl`
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        {
            let mut entries = self.inner.entries.lock().unwrap();
            entries.insert(
                key.into(),
                CacheEntry {
                    value,
                    expires_at: Instant::now() + ttl,
                },
            );
        }
        self.try_start_sweeper();
    }

    /// Lists live keys matching `pattern`.
    ///
    /// `"*"` matches everything. Any other pattern has its `*` characters
    /// stripped and is applied as a literal substring filter; this is not
    /// glob matching (known limitation, kept for compatibility with
    /// existing callers).
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        self.inner.prune_expired();
        let entries = self.inner.entries.lock().unwrap();
        if pattern == "*" {
            return entries.keys().cloned().collect();
        }
        let needle = pattern.replace('*', "");
        entries
            .keys()
            .filter(|key| key.contains(&needle))
            .cloned()
            .collect()
    }

    /// Number of entries currently held, expired or not
    pub fn len(&self) -> usize {
        self.inner.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops the sweep task. The cache itself stays readable/writable, but
    /// no further sweeping happens.
    pub async fn shutdown(&self) {
        self.inner.shutdown().await;
    }

    /// Starts the sweep task if idle and a runtime is current.
    ///
    /// The task holds only a weak handle so a dropped cache does not keep
    /// sweeping forever.
    fn try_start_sweeper(&self) {
        let mut sweeper = self.inner.sweeper.lock().unwrap();
        if !matches!(*sweeper, SweeperState::Idle) {
            return;
        }
        if Handle::try_current().is_err() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let interval = self.inner.cron_interval;
        let handle = tokio::spawn(sweep_loop(weak, interval));
        *sweeper = SweeperState::Running(handle);
    }
}

async fn sweep_loop<V>(inner: Weak<CacheInner<V>>, interval: Duration)
where
    V: Send + Sync + 'static,
{
    loop {
        tokio::time::sleep(interval).await;
        match inner.upgrade() {
            Some(cache) => cache.prune_expired(),
            None => break,
        }
    }
}
