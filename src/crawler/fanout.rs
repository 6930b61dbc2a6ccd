//! Bounded fan-out executor
//!
//! Platform responses are unreliable per item, so a batch must never be
//! lost to one bad unit: every unit runs to completion and its outcome is
//! reported independently. The semaphore is the only backpressure; all
//! targets are enqueued up front.

use crate::FetchError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Creates the shared semaphore bounding one batch.
///
/// Hold a clone to cancel the batch: closing the semaphore fails every
/// unit that has not yet acquired a permit with [`FetchError::Cancelled`],
/// while units already running finish normally.
pub fn batch_semaphore(max_concurrency: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(max_concurrency.max(1)))
}

/// Runs one unit of work per target with at most `max_concurrency` units
/// executing concurrently.
///
/// Outcomes are returned in target order. An individual failure never
/// aborts the batch; callers log failures and proceed.
pub async fn run_all<T, R, F, Fut>(
    targets: Vec<T>,
    max_concurrency: usize,
    worker: F,
) -> Vec<Result<R, FetchError>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, FetchError>>,
{
    run_all_with(batch_semaphore(max_concurrency), targets, worker).await
}

/// [`run_all`] over a caller-held semaphore from [`batch_semaphore`],
/// giving the caller the option to cancel pending units mid-batch.
pub async fn run_all_with<T, R, F, Fut>(
    semaphore: Arc<Semaphore>,
    targets: Vec<T>,
    worker: F,
) -> Vec<Result<R, FetchError>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, FetchError>>,
{
    let worker = &worker;

    let units = targets.into_iter().map(|target| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            // A closed semaphore means the caller cancelled pending units.
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Err(FetchError::Cancelled),
            };
            worker(target).await
        }
    });

    futures::future::join_all(units).await
}
