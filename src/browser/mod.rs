//! Browser automation collaborator traits
//!
//! The orchestration core never drives a browser directly. It consumes a
//! small surface (navigate, evaluate, wait for a matching response, read
//! and write cookies) behind these traits, so that a Playwright/CDP-style
//! backend (or a test double) can be plugged in from outside.

mod intercept;

pub use intercept::{InterceptClient, DEFAULT_BLOCK_MARKER};

use crate::session::Cookie;
use crate::BrowserError;
use async_trait::async_trait;
use std::time::Duration;

/// Predicate over an intercepted response's URL and status.
///
/// Matches when the URL contains `url_fragment` and the status equals
/// `status`. This mirrors how frontend API endpoints are recognized inside
/// a stream of page traffic.
#[derive(Debug, Clone)]
pub struct ResponseMatcher {
    pub url_fragment: String,
    pub status: u16,
}

impl ResponseMatcher {
    /// Matcher for a successful (200) response whose URL contains `fragment`
    pub fn ok(fragment: impl Into<String>) -> Self {
        Self {
            url_fragment: fragment.into(),
            status: 200,
        }
    }

    pub fn matches(&self, url: &str, status: u16) -> bool {
        url.contains(&self.url_fragment) && status == self.status
    }
}

/// A network response captured from page traffic
#[derive(Debug, Clone)]
pub struct InterceptedResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// One rendered page inside the browser
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigates the page to `url` and waits for the DOM to be ready
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Evaluates a script expression in the page and returns its JSON value
    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, BrowserError>;

    /// Resolves with the first response matching `matcher`, observing
    /// traffic from the moment this call is made.
    ///
    /// Returns [`BrowserError::ResponseTimeout`] if nothing matches within
    /// `timeout`.
    async fn wait_for_response(
        &self,
        matcher: &ResponseMatcher,
        timeout: Duration,
    ) -> Result<InterceptedResponse, BrowserError>;

    /// The page's current URL
    async fn current_url(&self) -> Result<String, BrowserError>;
}

/// The browser context owning the cookie jar shared by all pages
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// Reads the current cookie jar
    async fn cookies(&self) -> Result<Vec<Cookie>, BrowserError>;

    /// Adds cookies to the jar
    async fn add_cookies(&self, cookies: &[Cookie]) -> Result<(), BrowserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matcher_requires_fragment_and_status() {
        let matcher = ResponseMatcher::ok("/query/v1/search");
        assert!(matcher.matches("https://example.com/query/v1/search?q=x", 200));
        assert!(!matcher.matches("https://example.com/query/v1/search?q=x", 403));
        assert!(!matcher.matches("https://example.com/other", 200));
    }
}
