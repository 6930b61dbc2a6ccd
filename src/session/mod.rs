//! Session bridge between the browser-held cookie jar and the API client
//!
//! The browser owns the authoritative cookie jar. Programmatic calls need the
//! same credentials in two shapes: a single `Cookie` header string and a
//! structured name/value mapping for inspection. [`capture`] snapshots the
//! live jar into a [`Session`]; it must be called again after login or any
//! cookie refresh, since a snapshot never tracks later jar mutations.

use crate::browser::BrowserContext;
use crate::BrowserError;
use std::collections::HashMap;

/// A single browser cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

/// A snapshot of the browser session usable by a programmatic client
#[derive(Debug, Clone, Default)]
pub struct Session {
    cookies: Vec<Cookie>,
    header_overrides: HashMap<String, String>,
}

impl Session {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self {
            cookies,
            header_overrides: HashMap::new(),
        }
    }

    /// Serializes the jar into a `Cookie`-header-ready string
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Structured name -> value view of the jar
    pub fn cookie_map(&self) -> HashMap<String, String> {
        self.cookies
            .iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }

    /// Whether a cookie with the given name is present
    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.iter().any(|c| c.name == name)
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Sets a header override carried alongside the cookie credentials
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.header_overrides.insert(name.into(), value.into());
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.header_overrides
    }
}

/// Captures the current browser cookie jar into a [`Session`].
///
/// Always reflects the jar as it is right now; callable repeatedly.
pub async fn capture(context: &dyn BrowserContext) -> Result<Session, BrowserError> {
    let cookies = context.cookies().await?;
    tracing::debug!("Captured {} cookies from browser context", cookies.len());
    Ok(Session::new(cookies))
}

/// Parses a raw `name=value; name2=value2` cookie string into cookies scoped
/// to the given domain.
///
/// Entries without a `=` are skipped. Used by cookie-based login, where the
/// operator pastes a header string copied out of a real browser.
pub fn parse_cookie_header(raw: &str, domain: &str) -> Vec<Cookie> {
    raw.split(';')
        .filter_map(|part| {
            let part = part.trim();
            let (name, value) = part.split_once('=')?;
            if name.is_empty() {
                return None;
            }
            Some(Cookie {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
                domain: domain.to_string(),
                path: "/".to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_cookies() -> Vec<Cookie> {
        vec![
            Cookie {
                name: "token".to_string(),
                value: "abc123".to_string(),
                domain: ".example.com".to_string(),
                path: "/".to_string(),
            },
            Cookie {
                name: "session_id".to_string(),
                value: "xyz".to_string(),
                domain: ".example.com".to_string(),
                path: "/".to_string(),
            },
        ]
    }

    #[test]
    fn test_cookie_header_format() {
        let session = Session::new(create_test_cookies());
        assert_eq!(session.cookie_header(), "token=abc123; session_id=xyz");
    }

    #[test]
    fn test_cookie_map() {
        let session = Session::new(create_test_cookies());
        let map = session.cookie_map();
        assert_eq!(map.get("token").map(String::as_str), Some("abc123"));
        assert_eq!(map.get("session_id").map(String::as_str), Some("xyz"));
    }

    #[test]
    fn test_has_cookie() {
        let session = Session::new(create_test_cookies());
        assert!(session.has_cookie("token"));
        assert!(!session.has_cookie("missing"));
    }

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("a=1; b=2;c=3", ".example.com");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies[0].name, "a");
        assert_eq!(cookies[0].value, "1");
        assert_eq!(cookies[0].domain, ".example.com");
        assert_eq!(cookies[2].name, "c");
    }

    #[test]
    fn test_parse_cookie_header_skips_malformed() {
        let cookies = parse_cookie_header("a=1; garbage; =empty; b=2", ".example.com");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[1].name, "b");
    }

    #[test]
    fn test_empty_session() {
        let session = Session::default();
        assert_eq!(session.cookie_header(), "");
        assert!(session.cookie_map().is_empty());
    }

    #[test]
    fn test_header_overrides() {
        let mut session = Session::new(create_test_cookies());
        session.set_header("Referer", "https://example.com");
        assert_eq!(
            session.headers().get("Referer").map(String::as_str),
            Some("https://example.com")
        );
    }
}
