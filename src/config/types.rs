use serde::Deserialize;

/// Main configuration structure for Tidecrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub platform: PlatformConfig,
    pub crawl: CrawlConfig,
    pub login: LoginConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// Which crawl mode a run executes; modes are mutually exclusive per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    /// Iterate configured keywords through the platform's search surface
    Search,
    /// Fetch a configured list of item ids directly
    Detail,
    /// Walk configured creators' timelines for new items
    Creator,
}

/// How the run authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginType {
    /// Interactive: a human scans a QR code / signs in while we poll
    Qrcode,
    /// Apply a pasted cookie string directly
    Cookie,
}

/// Platform surface the orchestration targets
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Entry page opened before login and used as the navigation base
    #[serde(rename = "entry-url")]
    pub entry_url: String,

    /// Domain that pasted login cookies are scoped to (e.g. ".example.com")
    #[serde(rename = "cookie-domain")]
    pub cookie_domain: String,

    /// Body substring identifying the platform's anti-bot WAF challenge
    #[serde(rename = "block-marker", default = "default_block_marker")]
    pub block_marker: String,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    pub mode: CrawlMode,

    /// Comma-separated keywords, used by search mode
    #[serde(default)]
    pub keywords: String,

    /// Item ids, used by detail mode
    #[serde(rename = "item-ids", default)]
    pub item_ids: Vec<String>,

    /// Creator ids or share URLs, used by creator mode
    #[serde(rename = "creator-refs", default)]
    pub creator_refs: Vec<String>,

    /// Fan-out concurrency ceiling
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// New-item quota per keyword (search) and per creator pass (creator)
    #[serde(rename = "max-items-per-keyword", default = "default_max_items")]
    pub max_items_per_keyword: usize,

    /// Comment quota per item
    #[serde(rename = "max-comments-per-item", default = "default_max_comments")]
    pub max_comments_per_item: usize,

    #[serde(rename = "enable-comments", default = "default_true")]
    pub enable_comments: bool,

    #[serde(rename = "enable-media", default)]
    pub enable_media: bool,
}

impl CrawlConfig {
    /// Keywords split out of the comma-separated config string
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Login configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoginConfig {
    #[serde(rename = "login-type")]
    pub login_type: LoginType,

    /// Raw cookie header string, required for cookie login
    #[serde(default)]
    pub cookies: Option<String>,

    /// Cookie whose presence confirms an authenticated session
    #[serde(rename = "auth-cookie-name")]
    pub auth_cookie_name: String,

    /// Override for the signed-in identity probe expression
    #[serde(rename = "identity-probe", default)]
    pub identity_probe: Option<String>,
}

/// Expiring cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Background sweep interval in seconds
    #[serde(rename = "cron-interval-seconds", default = "default_cron_interval")]
    pub cron_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cron_interval_seconds: default_cron_interval(),
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    /// When false (default), egress is direct even if a provider is wired in
    #[serde(default)]
    pub enabled: bool,
}

fn default_block_marker() -> String {
    crate::browser::DEFAULT_BLOCK_MARKER.to_string()
}

fn default_max_concurrency() -> usize {
    4
}

fn default_max_items() -> usize {
    20
}

fn default_max_comments() -> usize {
    50
}

fn default_cron_interval() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_list_splits_and_trims() {
        let crawl = CrawlConfig {
            mode: CrawlMode::Search,
            keywords: "rust, async runtime ,,crawler".to_string(),
            item_ids: vec![],
            creator_refs: vec![],
            max_concurrency: 4,
            max_items_per_keyword: 20,
            max_comments_per_item: 50,
            enable_comments: true,
            enable_media: false,
        };
        assert_eq!(
            crawl.keyword_list(),
            vec![
                "rust".to_string(),
                "async runtime".to_string(),
                "crawler".to_string()
            ]
        );
    }
}
