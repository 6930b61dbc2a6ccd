//! Login state machine
//!
//! Two ways in: apply a pasted cookie string directly (no verification), or
//! drive an interactive flow where a human scans a QR code / signs in while
//! we poll the rendered page for a signed-in identity. The poll is a plain
//! boolean loop on a fixed interval with a bounded attempt budget;
//! exhausting the budget is fatal for the crawl run.

use crate::browser::{BrowserContext, BrowserPage};
use crate::config::{LoginConfig, LoginType};
use crate::session::parse_cookie_header;
use crate::{CrawlError, Result};
use std::time::Duration;

/// Default JS probe for a signed-in identity element in the page chrome.
///
/// Platforms render an avatar/profile element only for real accounts, which
/// distinguishes a logged-in user from a guest that merely holds cookies.
const DEFAULT_IDENTITY_PROBE: &str = r#"(() => {
    const userNav = document.querySelector('.nav__user');
    const avatar = document.querySelector('.nav__user-avatar');
    const profileLink = document.querySelector('a[href^="/u/"]');
    return !!(userNav || avatar || profileLink);
})()"#;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 300;

/// Observable states of the login flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    NotStarted,
    /// Interactive flow is waiting for the user to finish signing in
    AwaitingConfirmation,
    /// Terminal: a session is established
    LoggedIn,
    /// Terminal: login cannot complete (unusable cookie input, or the
    /// interactive confirmation budget ran out)
    Failed,
}

/// Drives authentication against the platform's entry page
pub struct LoginFlow {
    login_type: LoginType,
    entry_url: String,
    cookie_str: String,
    cookie_domain: String,
    auth_cookie_name: String,
    identity_probe: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
    state: LoginState,
}

impl LoginFlow {
    pub fn new(login: &LoginConfig, entry_url: &str, cookie_domain: &str) -> Self {
        Self {
            login_type: login.login_type,
            entry_url: entry_url.to_string(),
            cookie_str: login.cookies.clone().unwrap_or_default(),
            cookie_domain: cookie_domain.to_string(),
            auth_cookie_name: login.auth_cookie_name.clone(),
            identity_probe: login
                .identity_probe
                .clone()
                .unwrap_or_else(|| DEFAULT_IDENTITY_PROBE.to_string()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            state: LoginState::NotStarted,
        }
    }

    /// Shortens the poll schedule; used by tests
    pub fn with_poll_schedule(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Runs the configured login flow to a terminal state.
    ///
    /// Cookie login applies the parsed cookie string to the browser context
    /// and transitions straight to `LoggedIn` without any polling or
    /// verification. Interactive login navigates to the entry page and
    /// polls until both the identity element and the auth cookie are
    /// present, or the attempt budget runs out ([`CrawlError::LoginTimeout`],
    /// fatal for the run).
    pub async fn begin(
        &mut self,
        page: &dyn BrowserPage,
        context: &dyn BrowserContext,
    ) -> Result<()> {
        match self.login_type {
            LoginType::Cookie => self.login_by_cookies(context).await,
            LoginType::Qrcode => self.login_interactive(page, context).await,
        }
    }

    async fn login_by_cookies(&mut self, context: &dyn BrowserContext) -> Result<()> {
        tracing::info!("Applying cookie string to browser context");
        let cookies = parse_cookie_header(&self.cookie_str, &self.cookie_domain);
        if cookies.is_empty() {
            self.state = LoginState::Failed;
            return Err(CrawlError::UnsupportedLogin(
                "cookie login selected but the cookie string parsed to nothing".to_string(),
            ));
        }
        context.add_cookies(&cookies).await.map_err(CrawlError::from)?;
        self.state = LoginState::LoggedIn;
        tracing::info!("Cookie login applied ({} cookies)", cookies.len());
        Ok(())
    }

    async fn login_interactive(
        &mut self,
        page: &dyn BrowserPage,
        context: &dyn BrowserContext,
    ) -> Result<()> {
        tracing::info!("Opening {} for interactive login", self.entry_url);
        page.navigate(&self.entry_url).await.map_err(CrawlError::from)?;
        self.state = LoginState::AwaitingConfirmation;

        tracing::info!(
            "Waiting for manual sign-in (polling every {:?}, up to {} attempts)",
            self.poll_interval,
            self.max_poll_attempts
        );

        for attempt in 1..=self.max_poll_attempts {
            if self.poll_logged_in(page, context).await {
                tracing::info!("Login confirmed after {} poll(s)", attempt);
                self.state = LoginState::LoggedIn;
                return Ok(());
            }
            if attempt < self.max_poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        tracing::error!(
            "Login not confirmed within {} attempts; aborting run",
            self.max_poll_attempts
        );
        self.state = LoginState::Failed;
        Err(CrawlError::LoginTimeout {
            attempts: self.max_poll_attempts,
        })
    }

    /// One poll: the identity element must be rendered AND the auth cookie
    /// must be present in the live jar. Probe errors count as "not yet".
    async fn poll_logged_in(&self, page: &dyn BrowserPage, context: &dyn BrowserContext) -> bool {
        let identity_present = match page.evaluate(&self.identity_probe).await {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                tracing::debug!("Identity probe failed, treating as not logged in: {}", e);
                false
            }
        };
        if !identity_present {
            return false;
        }

        match context.cookies().await {
            Ok(cookies) => cookies.iter().any(|c| c.name == self.auth_cookie_name),
            Err(e) => {
                tracing::debug!("Cookie check failed, treating as not logged in: {}", e);
                false
            }
        }
    }
}
