//! Shared data model for crawled content
//!
//! These types are deliberately thin: platform adapters keep their full wire
//! payload in the `raw` field and surface only the handful of fields the
//! orchestration core needs (identifiers, display text, media pointers).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single crawled content item (post, video, note)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Platform-assigned item identifier
    pub id: String,

    /// Title or first line of the item, if the platform provides one
    #[serde(default)]
    pub title: Option<String>,

    /// Identifier of the authoring account, if known
    #[serde(default)]
    pub author_id: Option<String>,

    /// Publication timestamp, if the platform provides one
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Direct URLs to the item's media: a single entry for a video post,
    /// one per image for an image post
    #[serde(default)]
    pub media_urls: Vec<String>,

    /// The untouched platform payload
    #[serde(default)]
    pub raw: Value,
}

impl Item {
    /// Builds a minimal item carrying only an id and a media URL.
    ///
    /// Used by the degraded browser-extraction fallback, where nothing but
    /// the rendered page is available.
    pub fn minimal(id: impl Into<String>, title: impl Into<String>, media_url: String) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            author_id: None,
            created_at: Some(Utc::now()),
            media_urls: vec![media_url],
            raw: Value::Null,
        }
    }
}

/// A comment attached to an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Platform-assigned comment identifier
    pub id: String,

    /// Identifier of the item this comment belongs to
    pub item_id: String,

    /// Comment body text
    #[serde(default)]
    pub content: String,

    /// The untouched platform payload
    #[serde(default)]
    pub raw: Value,
}

/// Profile information for a content creator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorInfo {
    /// Canonical creator identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub nickname: Option<String>,

    /// The untouched platform payload
    #[serde(default)]
    pub raw: Value,
}

/// One page of keyword search results
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<Item>,
    pub next_cursor: String,
    pub has_more: bool,
}

/// One page of comments for an item
#[derive(Debug, Clone, Default)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub next_cursor: String,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_item_carries_media_url() {
        let item = Item::minimal("123", "a clip", "https://cdn.example.com/v.mp4".to_string());
        assert_eq!(item.id, "123");
        assert_eq!(item.media_urls, vec!["https://cdn.example.com/v.mp4".to_string()]);
        assert!(item.created_at.is_some());
        assert!(item.raw.is_null());
    }
}
