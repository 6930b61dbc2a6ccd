//! Crawl mode dispatcher
//!
//! The dispatcher is the top of the orchestration stack: it performs login,
//! bridges the browser session, then runs exactly one of the three crawl
//! modes. Per-unit failures are logged and counted, never escalated; the
//! only fatal errors are login failure and session capture failure.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::api::PlatformApi;
use crate::browser::{BrowserContext, BrowserPage, ResponseMatcher};
use crate::cache::{CacheRegistry, ExpiringCache};
use crate::config::{Config, CrawlMode};
use crate::crawler::resolve::{extract_ref, RefResolver, ResolvedRef};
use crate::crawler::{collect, jitter_sleep, run_all};
use crate::login::LoginFlow;
use crate::model::Item;
use crate::proxy::{Egress, ProxyProvider};
use crate::session::{self, Session};
use crate::storage::ItemStore;
use crate::{FetchError, Result};

/// How long a resolved share-link id stays valid in the cache
const RESOLVED_REF_TTL: Duration = Duration::from_secs(600);

/// Jitter ceiling between consecutive page fetches, in milliseconds
const PAGE_JITTER_MS: u64 = 1000;

/// How long the degraded extraction waits for a media response
const MEDIA_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Pulls the first timeline item's canonical id out of a rendered
/// creator page, for when the timeline API is unavailable
const FIRST_ITEM_PROBE: &str = r#"(() => {
  const a = document.querySelector('a[href*="/video/"]');
  if (!a) return null;
  const m = (a.getAttribute('href') || '').match(/\/video\/(\d+)/);
  return m ? m[1] : null;
})()"#;

/// Counters accumulated over one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Items persisted (including items recovered via page extraction)
    pub items: usize,
    /// Comments persisted across all items
    pub comments: usize,
    /// Creator profiles persisted
    pub creators: usize,
    /// Units that failed after all retries and fallbacks
    pub failed_units: usize,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "items: {}, comments: {}, creators: {}, failed units: {}",
            self.items, self.comments, self.creators, self.failed_units
        )
    }
}

/// Drives one crawl run against a single platform.
///
/// All platform specifics live behind the collaborator traits; the
/// dispatcher owns sequencing, concurrency limits, duplicate cutoff
/// and the degraded fallback path.
pub struct Dispatcher {
    config: Config,
    api: Arc<dyn PlatformApi>,
    store: Arc<dyn ItemStore>,
    page: Arc<dyn BrowserPage>,
    context: Arc<dyn BrowserContext>,
    proxy: Option<Arc<dyn ProxyProvider>>,
    resolved_refs: ExpiringCache<String>,
    session: Option<Session>,
}

impl Dispatcher {
    /// Builds a dispatcher and registers its resolution cache with
    /// `registry` so shutdown is coordinated with every other cache.
    pub fn new(
        config: Config,
        api: Arc<dyn PlatformApi>,
        store: Arc<dyn ItemStore>,
        page: Arc<dyn BrowserPage>,
        context: Arc<dyn BrowserContext>,
        registry: &CacheRegistry,
    ) -> Self {
        let resolved_refs =
            ExpiringCache::new(Duration::from_secs(config.cache.cron_interval_seconds));
        registry.register(&resolved_refs);
        Self {
            config,
            api,
            store,
            page,
            context,
            proxy: None,
            resolved_refs,
            session: None,
        }
    }

    /// Wires an egress proxy provider, consulted when the config enables
    /// proxying
    pub fn with_proxy_provider(mut self, provider: Arc<dyn ProxyProvider>) -> Self {
        self.proxy = Some(provider);
        self
    }

    /// The session bridged from the browser, once [`Dispatcher::run`] has
    /// completed login
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Runs login, session capture and the configured crawl mode to
    /// completion
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let mut egress = Egress::direct();
        if self.config.proxy.enabled {
            match &self.proxy {
                Some(provider) => {
                    egress = provider.acquire().await?;
                    info!(proxy = ?egress.http_proxy_url, "Egress proxy acquired");
                }
                None => warn!("Proxying enabled but no provider wired, going direct"),
            }
        }

        let mut flow = LoginFlow::new(
            &self.config.login,
            &self.config.platform.entry_url,
            &self.config.platform.cookie_domain,
        );
        flow.begin(self.page.as_ref(), self.context.as_ref()).await?;
        info!(state = ?flow.state(), "Login complete");

        let mut session = session::capture(self.context.as_ref()).await?;
        let cookie_header = session.cookie_header();
        session.set_header("Cookie", cookie_header);
        info!(
            cookies = session.cookies().len(),
            "Session bridged from browser context"
        );
        self.session = Some(session);

        let mut summary = CrawlSummary::default();
        match self.config.crawl.mode {
            CrawlMode::Search => self.run_search(&mut summary).await,
            CrawlMode::Detail => self.run_detail(&mut summary).await,
            CrawlMode::Creator => self.run_creator(&egress, &mut summary).await?,
        }
        info!(%summary, "Crawl finished");
        Ok(summary)
    }

    fn base_url(&self) -> &str {
        self.config.platform.entry_url.trim_end_matches('/')
    }

    // ---- search mode ----

    async fn run_search(&self, summary: &mut CrawlSummary) {
        for keyword in self.config.crawl.keyword_list() {
            info!(%keyword, "Searching");
            let ids = self.search_keyword(&keyword, summary).await;
            info!(%keyword, items = ids.len(), "Keyword pass complete");
            self.fan_out_comments(&ids, summary).await;
        }
    }

    /// Pages through search results for one keyword, persisting each item
    /// as it arrives, until the per-keyword budget or the result set is
    /// exhausted. Returns the ids persisted for this keyword.
    async fn search_keyword(&self, keyword: &str, summary: &mut CrawlSummary) -> Vec<String> {
        let mut ids = Vec::new();
        let mut cursor = String::new();
        'paging: loop {
            let page = match self.api.search(keyword, &cursor).await {
                Ok(page) => page,
                Err(err) => {
                    warn!(%keyword, %err, "Search page fetch failed, skipping rest of keyword");
                    summary.failed_units += 1;
                    break;
                }
            };
            if page.items.is_empty() {
                break;
            }
            for item in &page.items {
                match self.persist_item(item).await {
                    Ok(()) => {
                        summary.items += 1;
                        ids.push(item.id.clone());
                    }
                    Err(err) => {
                        warn!(item_id = %item.id, %err, "Failed to persist search result");
                        summary.failed_units += 1;
                    }
                }
                if ids.len() >= self.config.crawl.max_items_per_keyword {
                    break 'paging;
                }
            }
            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
            jitter_sleep(PAGE_JITTER_MS).await;
        }
        ids
    }

    // ---- detail mode ----

    async fn run_detail(&self, summary: &mut CrawlSummary) {
        let ids = self.config.crawl.item_ids.clone();
        info!(count = ids.len(), "Fetching item details");
        let results = run_all(ids.clone(), self.config.crawl.max_concurrency, |id| {
            self.fetch_and_persist(id)
        })
        .await;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(true) => summary.items += 1,
                Ok(false) => debug!(item_id = %id, "Item not found, skipping"),
                Err(err) => {
                    warn!(item_id = %id, %err, "Detail fetch failed");
                    summary.failed_units += 1;
                }
            }
        }
        self.fan_out_comments(&ids, summary).await;
    }

    async fn fetch_and_persist(&self, id: String) -> std::result::Result<bool, FetchError> {
        jitter_sleep(PAGE_JITTER_MS).await;
        match self.api.get_item(&id).await? {
            Some(item) => {
                self.persist_item(&item).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ---- creator mode ----

    async fn run_creator(&self, egress: &Egress, summary: &mut CrawlSummary) -> Result<()> {
        let resolver = RefResolver::new(egress.http_proxy_url.as_deref())?;
        for creator_ref in &self.config.crawl.creator_refs {
            let creator_id = match self.resolve_creator_ref(creator_ref, &resolver).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    warn!(%creator_ref, "Reference did not resolve to a creator, trying page extraction");
                    self.degraded_single_item(creator_ref, summary).await;
                    continue;
                }
                Err(err) => {
                    error!(%creator_ref, %err, "Reference resolution failed");
                    summary.failed_units += 1;
                    continue;
                }
            };
            match self.crawl_creator(&creator_id, summary).await {
                Ok(()) => {}
                Err(FetchError::Blocked(marker)) => {
                    warn!(%creator_id, %marker, "Creator timeline blocked, falling back to page extraction");
                    let page_url = format!("{}/user/{}", self.base_url(), creator_id);
                    self.degraded_single_item(&page_url, summary).await;
                }
                Err(err) => {
                    error!(%creator_id, %err, "Creator pass failed");
                    summary.failed_units += 1;
                }
            }
        }
        Ok(())
    }

    /// Turns a configured creator reference into a canonical creator id.
    /// Plain ids pass through; share links go through the redirect
    /// resolver, with successful resolutions cached for a few minutes.
    async fn resolve_creator_ref(
        &self,
        creator_ref: &str,
        resolver: &RefResolver,
    ) -> std::result::Result<Option<String>, FetchError> {
        if !creator_ref.starts_with("http://") && !creator_ref.starts_with("https://") {
            return Ok(Some(creator_ref.to_string()));
        }
        let cache_key = format!("resolved:{creator_ref}");
        if let Some(id) = self.resolved_refs.get(&cache_key) {
            debug!(%creator_ref, %id, "Share link resolved from cache");
            return Ok(Some(id));
        }
        match resolver.resolve(creator_ref).await? {
            Some(ResolvedRef::Creator(id)) => {
                self.resolved_refs
                    .set(cache_key, id.clone(), RESOLVED_REF_TTL);
                Ok(Some(id))
            }
            Some(ResolvedRef::Item(id)) => {
                debug!(%creator_ref, %id, "Share link points at a single item");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Full creator pass: profile, then all timeline items newer than the
    /// newest one already stored, then comments for the new items.
    async fn crawl_creator(
        &self,
        creator_id: &str,
        summary: &mut CrawlSummary,
    ) -> std::result::Result<(), FetchError> {
        match self.api.get_creator(creator_id).await? {
            Some(info) => {
                self.store.save_creator(creator_id, &info).await?;
                summary.creators += 1;
            }
            None => warn!(%creator_id, "Creator profile not found"),
        }

        let api = Arc::clone(&self.api);
        let timeline_id = creator_id.to_string();
        let fetch_page = move |cursor: String| {
            let api = Arc::clone(&api);
            let id = timeline_id.clone();
            async move { api.get_creator_items(&id, &cursor).await }
        };
        let store = Arc::clone(&self.store);
        let is_known = move |item: &Item| {
            let store = Arc::clone(&store);
            let id = item.id.clone();
            async move {
                let present = store.exists(&[id]).await?;
                Ok(!present.is_empty())
            }
        };
        let new_items = collect(
            fetch_page,
            is_known,
            self.config.crawl.max_items_per_keyword,
        )
        .await?;
        info!(%creator_id, count = new_items.len(), "New timeline items to persist");

        let ids: Vec<String> = new_items.iter().map(|item| item.id.clone()).collect();
        let results = run_all(new_items, self.config.crawl.max_concurrency, |item| {
            self.persist_owned(item)
        })
        .await;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => summary.items += 1,
                Err(err) => {
                    warn!(item_id = %id, %err, "Failed to persist timeline item");
                    summary.failed_units += 1;
                }
            }
        }
        self.fan_out_comments(&ids, summary).await;
        Ok(())
    }

    // ---- degraded fallback ----

    async fn degraded_single_item(&self, page_url: &str, summary: &mut CrawlSummary) {
        match self.extract_single_item(page_url).await {
            Ok(Some(item)) => match self.persist_item(&item).await {
                Ok(()) => {
                    info!(item_id = %item.id, "Recovered one item via page extraction");
                    summary.items += 1;
                }
                Err(err) => {
                    warn!(item_id = %item.id, %err, "Failed to persist extracted item");
                    summary.failed_units += 1;
                }
            },
            Ok(None) => {
                warn!(%page_url, "Page extraction found no item");
                summary.failed_units += 1;
            }
            Err(err) => {
                warn!(%page_url, %err, "Page extraction failed");
                summary.failed_units += 1;
            }
        }
    }

    /// Last-resort extraction through the rendered page: finds the first
    /// item linked from `page_url`, opens it, and captures the media URL
    /// from network traffic instead of the blocked API.
    async fn extract_single_item(
        &self,
        page_url: &str,
    ) -> std::result::Result<Option<Item>, FetchError> {
        self.page.navigate(page_url).await?;
        let item_id = match self.page.evaluate(FIRST_ITEM_PROBE).await? {
            Value::String(id) if !id.is_empty() => id,
            _ => {
                // Some share links land directly on an item page.
                let current = self.page.current_url().await?;
                match extract_ref(&current) {
                    Some(ResolvedRef::Item(id)) => id,
                    _ => return Ok(None),
                }
            }
        };

        let video_url = format!("{}/video/{}", self.base_url(), item_id);
        let matcher = ResponseMatcher::ok(".mp4");
        let (response, navigated) = tokio::join!(
            self.page.wait_for_response(&matcher, MEDIA_RESPONSE_TIMEOUT),
            self.page.navigate(&video_url),
        );
        navigated?;
        let response = response?;

        let title = match self.page.evaluate("document.title").await {
            Ok(Value::String(title)) => title,
            _ => String::new(),
        };
        Ok(Some(Item::minimal(item_id, title, response.url)))
    }

    // ---- shared persistence ----

    /// Fans comment retrieval out over `ids` with the configured
    /// concurrency limit. A failing item is counted and skipped; the batch
    /// always runs to completion.
    async fn fan_out_comments(&self, ids: &[String], summary: &mut CrawlSummary) {
        if !self.config.crawl.enable_comments || ids.is_empty() {
            return;
        }
        info!(count = ids.len(), "Fetching comments");
        let results = run_all(ids.to_vec(), self.config.crawl.max_concurrency, |id| {
            self.fetch_comments_for(id)
        })
        .await;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(count) => summary.comments += count,
                Err(err) => {
                    warn!(item_id = %id, %err, "Comment retrieval failed");
                    summary.failed_units += 1;
                }
            }
        }
    }

    async fn fetch_comments_for(&self, id: String) -> std::result::Result<usize, FetchError> {
        let max = self.config.crawl.max_comments_per_item;
        let mut fetched = 0usize;
        let mut cursor = String::new();
        loop {
            let page = self.api.get_comments(&id, &cursor).await?;
            if page.comments.is_empty() {
                break;
            }
            let mut batch = page.comments;
            if fetched + batch.len() > max {
                batch.truncate(max - fetched);
            }
            self.store.upsert_comments(&id, &batch).await?;
            fetched += batch.len();
            if fetched >= max || !page.has_more {
                break;
            }
            cursor = page.next_cursor;
            jitter_sleep(PAGE_JITTER_MS).await;
        }
        Ok(fetched)
    }

    async fn persist_owned(&self, item: Item) -> std::result::Result<(), FetchError> {
        jitter_sleep(PAGE_JITTER_MS).await;
        self.persist_item(&item).await
    }

    /// Persists an item and, when media download is enabled, each of its
    /// media files (one URL for a video post, one per image for an image
    /// post). Media failures are logged and swallowed; the metadata write
    /// has already succeeded.
    async fn persist_item(&self, item: &Item) -> std::result::Result<(), FetchError> {
        self.store.upsert_item(item).await?;
        if self.config.crawl.enable_media {
            for (index, url) in item.media_urls.iter().enumerate() {
                match self.api.fetch_media(url).await {
                    Ok(bytes) => {
                        self.store
                            .save_media(&item.id, &media_file_name(url, index), &bytes)
                            .await?
                    }
                    Err(err) => warn!(item_id = %item.id, %url, %err, "Media download failed"),
                }
            }
        }
        Ok(())
    }
}

/// File name for one downloaded media URL: the final URL path segment when
/// it carries an extension, an indexed fallback otherwise
fn media_file_name(url: &str, index: usize) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && name.contains('.'))
    {
        Some(name) => name.to_string(),
        None => format!("media-{index}.bin"),
    }
}
