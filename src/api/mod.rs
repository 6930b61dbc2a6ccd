//! Programmatic API client collaborator
//!
//! Each platform adapter (built elsewhere on top of the interception client
//! or a vendor SDK) implements this trait. The orchestration core only
//! depends on the shape of the pages it returns and on the error
//! classification in [`FetchError`].

use crate::model::{CommentPage, CreatorInfo, Item, SearchPage};
use crate::crawler::TimelinePage;
use crate::FetchError;
use async_trait::async_trait;

/// Per-platform API surface consumed by the dispatcher.
///
/// A missing item or user is a normal empty result (`Ok(None)`), not an
/// error; [`FetchError::Blocked`] signals the anti-bot path and is never
/// retried by callers.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// One page of keyword search results
    async fn search(&self, keyword: &str, cursor: &str) -> Result<SearchPage, FetchError>;

    /// Full detail for a single item
    async fn get_item(&self, id: &str) -> Result<Option<Item>, FetchError>;

    /// One page of comments under an item
    async fn get_comments(&self, id: &str, cursor: &str) -> Result<CommentPage, FetchError>;

    /// Profile information for a creator
    async fn get_creator(&self, creator_id: &str) -> Result<Option<CreatorInfo>, FetchError>;

    /// One page of a creator's timeline, newest first
    async fn get_creator_items(
        &self,
        creator_id: &str,
        cursor: &str,
    ) -> Result<TimelinePage<Item>, FetchError>;

    /// Raw media bytes for a previously discovered media URL
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
