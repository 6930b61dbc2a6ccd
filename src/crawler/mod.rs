//! Crawl orchestration
//!
//! This module contains the per-platform driver and its moving parts:
//! - [`Dispatcher`]: top-level mode selection and sequencing
//! - [`fanout::run_all`]: bounded-concurrency batch execution
//! - [`collector::collect`]: duplicate-aware timeline pagination
//! - [`resolve::RefResolver`]: share-link to canonical-id resolution

mod collector;
mod dispatcher;
mod fanout;
mod resolve;

pub use collector::{collect, PaginationCursor, TimelinePage};
pub use dispatcher::{CrawlSummary, Dispatcher};
pub use fanout::{batch_semaphore, run_all, run_all_with};
pub use resolve::{extract_ref, RefResolver, ResolvedRef};

use rand::Rng;
use std::time::Duration;

/// Sleeps a random 0..`max_ms` milliseconds between item fetches to keep
/// request timing from looking machine-regular
pub(crate) async fn jitter_sleep(max_ms: u64) {
    let delay = rand::thread_rng().gen_range(0..max_ms.max(1));
    tokio::time::sleep(Duration::from_millis(delay)).await;
}
