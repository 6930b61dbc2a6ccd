//! Storage collaborator
//!
//! The core is indifferent to where crawled data lands (relational store,
//! flat files); it consumes the [`ItemStore`] contract only. A simple
//! in-memory implementation is provided for tests and dry runs.

mod memory;

pub use memory::MemoryStore;

use crate::model::{Comment, CreatorInfo, Item};
use crate::StorageError;
use async_trait::async_trait;
use std::collections::HashSet;

/// Persistence surface consumed by the dispatcher
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Inserts or updates an item's metadata
    async fn upsert_item(&self, item: &Item) -> Result<(), StorageError>;

    /// Inserts or updates a batch of comments for an item
    async fn upsert_comments(&self, item_id: &str, comments: &[Comment])
        -> Result<(), StorageError>;

    /// Which of the given ids are already persisted
    async fn exists(&self, ids: &[String]) -> Result<HashSet<String>, StorageError>;

    /// Inserts or updates a creator's profile
    async fn save_creator(&self, id: &str, info: &CreatorInfo) -> Result<(), StorageError>;

    /// Stores raw media bytes for an item
    async fn save_media(
        &self,
        item_id: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<(), StorageError>;
}
