//! Shortened-reference resolution
//!
//! Creator references in config may be share links (`https://v.example/abc`)
//! rather than canonical identifiers. Resolution follows the redirect chain
//! with a mobile user agent (share links frequently bounce desktop UAs to an
//! interstitial) and extracts the identifier from the final URL.

use crate::FetchError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};
use std::time::Duration;

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 13_2_3 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.0.3 Mobile/15E148 Safari/604.1";

static CREATOR_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sec_uid=([A-Za-z0-9_-]+)").expect("valid regex"));
static ITEM_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/video/(\d+)").expect("valid regex"));

/// What a share link resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRef {
    /// Canonical creator identifier
    Creator(String),
    /// A single item's identifier
    Item(String),
}

/// Follows share-link redirects to a canonical reference
pub struct RefResolver {
    client: Client,
}

impl RefResolver {
    /// Builds a resolver, optionally routing through the given HTTP proxy
    pub fn new(http_proxy_url: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .user_agent(MOBILE_USER_AGENT)
            .timeout(Duration::from_secs(20))
            .redirect(Policy::limited(10));
        if let Some(proxy_url) = http_proxy_url {
            builder = builder.proxy(Proxy::all(proxy_url)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Resolves a share URL by following redirects and inspecting the final
    /// URL.
    ///
    /// `Ok(None)` when the final URL carries neither a creator nor an item
    /// identifier; the caller decides how to degrade.
    pub async fn resolve(&self, short_url: &str) -> Result<Option<ResolvedRef>, FetchError> {
        let response = self.client.get(short_url).send().await?;
        let final_url = response.url().to_string();
        tracing::debug!("Resolved {} -> {}", short_url, final_url);
        Ok(extract_ref(&final_url))
    }
}

/// Pulls a creator or item identifier out of a resolved URL
pub fn extract_ref(url: &str) -> Option<ResolvedRef> {
    if let Some(captures) = CREATOR_ID_RE.captures(url) {
        return Some(ResolvedRef::Creator(captures[1].to_string()));
    }
    if let Some(captures) = ITEM_ID_RE.captures(url) {
        return Some(ResolvedRef::Item(captures[1].to_string()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_creator_ref() {
        let url = "https://www.example.com/user/profile?sec_uid=MS4wLjABAAAA_x-9&from=share";
        assert_eq!(
            extract_ref(url),
            Some(ResolvedRef::Creator("MS4wLjABAAAA_x-9".to_string()))
        );
    }

    #[test]
    fn test_extract_item_ref() {
        let url = "https://www.example.com/video/7301234567890123456?from=share";
        assert_eq!(
            extract_ref(url),
            Some(ResolvedRef::Item("7301234567890123456".to_string()))
        );
    }

    #[test]
    fn test_creator_ref_wins_over_item_ref() {
        let url = "https://www.example.com/video/123?sec_uid=ABC";
        assert_eq!(extract_ref(url), Some(ResolvedRef::Creator("ABC".to_string())));
    }

    #[test]
    fn test_extract_nothing() {
        assert_eq!(extract_ref("https://www.example.com/trending"), None);
    }

    #[tokio::test]
    async fn test_resolve_follows_redirects() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/abc"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "/user/profile?sec_uid=RESOLVED_ID"),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/user/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_string("profile page"))
            .mount(&server)
            .await;

        let resolver = RefResolver::new(None).unwrap();
        let resolved = resolver
            .resolve(&format!("{}/abc", server.uri()))
            .await
            .unwrap();

        assert_eq!(resolved, Some(ResolvedRef::Creator("RESOLVED_ID".to_string())));
    }

    #[tokio::test]
    async fn test_resolve_dead_link_yields_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(200).set_body_string("landing"))
            .mount(&server)
            .await;

        let resolver = RefResolver::new(None).unwrap();
        let resolved = resolver
            .resolve(&format!("{}/gone", server.uri()))
            .await
            .unwrap();
        assert_eq!(resolved, None);
    }
}
