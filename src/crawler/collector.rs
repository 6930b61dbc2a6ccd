//! Paginated duplicate-aware collector
//!
//! Creator timelines are reverse-chronological, so the first already-seen
//! item implies everything after it was collected in a prior pass. Items
//! are therefore checked against persisted state one at a time, in page
//! order, and collection stops at the exact first duplicate instead of
//! after a whole page of them; wasted fetches are bounded to at most one
//! page beyond the useful frontier.

use crate::FetchError;
use std::future::Future;

/// One page of a cursor-based timeline listing
#[derive(Debug, Clone)]
pub struct TimelinePage<I> {
    pub items: Vec<I>,
    pub next_cursor: String,
    pub has_more: bool,
}

impl<I> Default for TimelinePage<I> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: String::new(),
            has_more: false,
        }
    }
}

/// Cursor state for one pass over a timeline
#[derive(Debug, Clone, Default)]
pub struct PaginationCursor {
    pub opaque_cursor: String,
    pub seen_count: usize,
}

/// Walks a cursor-based listing until the first known item, `max_count` new
/// items, or source exhaustion.
///
/// `fetch_page` is called with the opaque cursor (empty for the first
/// page); `is_known` is consulted per item, in page order. On the first
/// known item the remainder of that page is discarded and no further page
/// is fetched. Page order and item order are preserved in the result.
pub async fn collect<I, FP, FutP, FK, FutK>(
    fetch_page: FP,
    is_known: FK,
    max_count: usize,
) -> Result<Vec<I>, FetchError>
where
    FP: Fn(String) -> FutP,
    FutP: Future<Output = Result<TimelinePage<I>, FetchError>>,
    FK: Fn(&I) -> FutK,
    FutK: Future<Output = Result<bool, FetchError>>,
{
    let mut cursor = PaginationCursor::default();
    let mut collected: Vec<I> = Vec::new();

    loop {
        let page = fetch_page(cursor.opaque_cursor.clone()).await?;
        if page.items.is_empty() {
            tracing::debug!("Timeline page empty, stopping after {} items", collected.len());
            break;
        }

        let mut stop = false;
        for item in page.items {
            if is_known(&item).await? {
                tracing::info!(
                    "Hit previously collected item after {} new, stopping",
                    collected.len()
                );
                stop = true;
                break;
            }
            collected.push(item);
            cursor.seen_count += 1;
            if collected.len() >= max_count {
                tracing::debug!("Reached collection quota of {}", max_count);
                stop = true;
                break;
            }
        }

        if stop || !page.has_more {
            break;
        }
        cursor.opaque_cursor = page.next_cursor;
    }

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn make_pages(pages: Vec<Vec<&str>>) -> Vec<TimelinePage<String>> {
        let total = pages.len();
        pages
            .into_iter()
            .enumerate()
            .map(|(i, items)| TimelinePage {
                items: items.into_iter().map(String::from).collect(),
                next_cursor: format!("cursor-{}", i + 1),
                has_more: i + 1 < total,
            })
            .collect()
    }

    async fn run_collect(
        pages: Vec<TimelinePage<String>>,
        known: Vec<&str>,
        max_count: usize,
    ) -> (Vec<String>, usize) {
        let fetches = AtomicUsize::new(0);
        let pages = Mutex::new(pages.into_iter());
        let known: Vec<String> = known.into_iter().map(String::from).collect();

        let collected = collect(
            |_cursor| {
                fetches.fetch_add(1, Ordering::SeqCst);
                let page = pages.lock().unwrap().next().unwrap_or_default();
                async move { Ok(page) }
            },
            |item: &String| {
                let hit = known.contains(item);
                async move { Ok(hit) }
            },
            max_count,
        )
        .await
        .unwrap();

        (collected, fetches.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_stops_at_first_known_item() {
        // Pages [[A,B,C],[D,E]] with B known: exactly [A], and the second
        // page is never fetched.
        let pages = make_pages(vec![vec!["A", "B", "C"], vec!["D", "E"]]);
        let (collected, fetches) = run_collect(pages, vec!["B"], 10).await;

        assert_eq!(collected, vec!["A".to_string()]);
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn test_collects_across_pages_until_exhausted() {
        let pages = make_pages(vec![vec!["A", "B"], vec!["C"]]);
        let (collected, fetches) = run_collect(pages, vec![], 10).await;

        assert_eq!(
            collected,
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        );
        assert_eq!(fetches, 2);
    }

    #[tokio::test]
    async fn test_quota_stops_mid_page() {
        let pages = make_pages(vec![vec!["A", "B", "C"], vec!["D"]]);
        let (collected, fetches) = run_collect(pages, vec![], 2).await;

        assert_eq!(collected, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let pages = vec![TimelinePage::default()];
        let (collected, fetches) = run_collect(pages, vec![], 10).await;

        assert!(collected.is_empty());
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let result: Result<Vec<String>, _> = collect(
            |_cursor| async { Err(FetchError::Timeout) },
            |_item: &String| async { Ok(false) },
            10,
        )
        .await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }
}
