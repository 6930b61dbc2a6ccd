//! In-memory store used by tests and dry runs

use crate::model::{Comment, CreatorInfo, Item};
use crate::storage::ItemStore;
use crate::StorageError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Keeps everything in process memory; contents are inspectable, which is
/// what the integration tests need
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, Item>>,
    comments: Mutex<HashMap<String, Vec<Comment>>>,
    creators: Mutex<HashMap<String, CreatorInfo>>,
    media: Mutex<HashMap<String, Vec<(String, usize)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.lock().unwrap().values().map(Vec::len).sum()
    }

    pub fn creator_count(&self) -> usize {
        self.creators.lock().unwrap().len()
    }

    pub fn item(&self, id: &str) -> Option<Item> {
        self.items.lock().unwrap().get(id).cloned()
    }

    pub fn comments_for(&self, item_id: &str) -> Vec<Comment> {
        self.comments
            .lock()
            .unwrap()
            .get(item_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn media_for(&self, item_id: &str) -> Vec<(String, usize)> {
        self.media
            .lock()
            .unwrap()
            .get(item_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Pre-seeds an item id as already crawled
    pub fn seed_item(&self, item: Item) {
        self.items.lock().unwrap().insert(item.id.clone(), item);
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn upsert_item(&self, item: &Item) -> Result<(), StorageError> {
        self.items
            .lock()
            .unwrap()
            .insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn upsert_comments(
        &self,
        item_id: &str,
        comments: &[Comment],
    ) -> Result<(), StorageError> {
        let mut all = self.comments.lock().unwrap();
        let entry = all.entry(item_id.to_string()).or_default();
        for comment in comments {
            if !entry.iter().any(|c| c.id == comment.id) {
                entry.push(comment.clone());
            }
        }
        Ok(())
    }

    async fn exists(&self, ids: &[String]) -> Result<HashSet<String>, StorageError> {
        let items = self.items.lock().unwrap();
        Ok(ids
            .iter()
            .filter(|id| items.contains_key(*id))
            .cloned()
            .collect())
    }

    async fn save_creator(&self, id: &str, info: &CreatorInfo) -> Result<(), StorageError> {
        self.creators
            .lock()
            .unwrap()
            .insert(id.to_string(), info.clone());
        Ok(())
    }

    async fn save_media(
        &self,
        item_id: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<(), StorageError> {
        self.media
            .lock()
            .unwrap()
            .entry(item_id.to_string())
            .or_default()
            .push((file_name.to_string(), content.len()));
        Ok(())
    }
}
