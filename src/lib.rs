//! Tidecrawl: a crawl orchestration core for browser-backed platforms
//!
//! This crate implements the orchestration layer that drives automated data
//! collection from external content platforms: bridging a browser-held session
//! to a programmatic client, bounded-concurrency fan-out for detail and
//! comment retrieval, duplicate-aware timeline pagination, retry/backoff
//! around a non-cooperative counterparty, and a short-TTL in-process cache
//! with coordinated shutdown. The browser automation backend, platform wire
//! formats, and persistent storage are external collaborators consumed
//! through traits.

pub mod api;
pub mod browser;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod login;
pub mod model;
pub mod proxy;
pub mod session;
pub mod storage;

use std::time::Duration;
use thiserror::Error;

/// Main error type for Tidecrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Login did not complete within {attempts} poll attempts")]
    LoginTimeout { attempts: u32 },

    #[error("Unsupported login type: {0}")]
    UnsupportedLogin(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classified failure of a single logical fetch.
///
/// The taxonomy drives retry decisions: [`FetchError::is_retryable`] is true
/// for transient failures (timeout, empty body, decode failure without a
/// block marker) and false for anti-bot blocks, which must surface to the
/// dispatcher instead of burning retry budget.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timed out waiting for a matching response")]
    Timeout,

    #[error("Matched response had an empty body")]
    EmptyBody,

    #[error("Failed to decode response body: {0}")]
    Decode(String),

    #[error("Blocked by anti-bot protection: {0}")]
    Blocked(String),

    #[error("Unit cancelled before it started")]
    Cancelled,

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl FetchError {
    /// Whether the interception layer may retry after this failure
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout | FetchError::EmptyBody | FetchError::Decode(_)
        )
    }
}

/// Errors surfaced by the browser automation collaborator
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("No response matched within {0:?}")]
    ResponseTimeout(Duration),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script evaluation failed: {0}")]
    Evaluate(String),

    #[error("Browser backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the storage collaborator
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Tidecrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cache::{CacheRegistry, ExpiringCache};
pub use config::{Config, CrawlMode, LoginType};
pub use crawler::Dispatcher;
pub use session::Session;
