//! Response interception client
//!
//! Platforms that hide their API behind a rendered frontend are crawled by
//! triggering a page action (navigation, scroll) and capturing the network
//! response the frontend itself makes. [`InterceptClient::call`] wraps that
//! dance with failure classification and bounded randomized-backoff retries.
//! The whole trigger is re-run on each retry: the trigger usually *causes*
//! the traffic we are waiting for, so re-arming the listener alone would
//! wait forever.

use crate::browser::{BrowserPage, ResponseMatcher};
use crate::{BrowserError, FetchError};
use rand::Rng;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Body marker emitted by the platform's WAF when a request is challenged
pub const DEFAULT_BLOCK_MARKER: &str = "aliyun_waf";

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Issues logical requests by triggering page actions and intercepting the
/// matching network response
#[derive(Debug, Clone)]
pub struct InterceptClient {
    response_timeout: Duration,
    max_attempts: u32,
    backoff_range_ms: (u64, u64),
    block_marker: String,
}

impl Default for InterceptClient {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_range_ms: (2_000, 4_000),
            block_marker: DEFAULT_BLOCK_MARKER.to_string(),
        }
    }
}

impl InterceptClient {
    pub fn new(block_marker: impl Into<String>) -> Self {
        Self {
            block_marker: block_marker.into(),
            ..Self::default()
        }
    }

    /// Overrides the per-attempt response wait timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Performs one logical call: arm the response listener, run `trigger`,
    /// and resolve with the first response satisfying `matcher`.
    ///
    /// Failure classification, in order: listener timeout is retryable; an
    /// empty matched body is retryable; a body that fails to decode and
    /// contains the block marker is a non-retryable [`FetchError::Blocked`];
    /// any other decode failure is retryable. Retryable failures re-run the
    /// full trigger after a randomized backoff, up to the attempt bound;
    /// exhaustion surfaces the last captured error.
    pub async fn call<F, Fut>(
        &self,
        page: &dyn BrowserPage,
        matcher: &ResponseMatcher,
        trigger: F,
    ) -> Result<Value, FetchError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), BrowserError>>,
    {
        let mut last_err = FetchError::Timeout;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let backoff = self.backoff_delay();
                tracing::debug!(
                    "Interception attempt {}/{} for '{}' after {:?} backoff",
                    attempt,
                    self.max_attempts,
                    matcher.url_fragment,
                    backoff
                );
                tokio::time::sleep(backoff).await;
            }

            // The listener must be armed before the trigger runs; both are
            // driven concurrently so the trigger's traffic is observed.
            let (wait_result, trigger_result) = tokio::join!(
                page.wait_for_response(matcher, self.response_timeout),
                trigger()
            );

            if let Err(e) = trigger_result {
                tracing::warn!(
                    "Trigger action failed on attempt {}/{}: {}",
                    attempt,
                    self.max_attempts,
                    e
                );
                last_err = FetchError::Browser(e);
                continue;
            }

            match wait_result {
                Ok(response) => match self.decode_body(&response.body) {
                    Ok(value) => return Ok(value),
                    Err(blocked @ FetchError::Blocked(_)) => {
                        tracing::error!(
                            "Blocked while intercepting '{}': giving up without retry",
                            matcher.url_fragment
                        );
                        return Err(blocked);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Interception attempt {}/{} failed: {}",
                            attempt,
                            self.max_attempts,
                            e
                        );
                        last_err = e;
                    }
                },
                Err(BrowserError::ResponseTimeout(waited)) => {
                    tracing::warn!(
                        "No response matched '{}' within {:?} (attempt {}/{})",
                        matcher.url_fragment,
                        waited,
                        attempt,
                        self.max_attempts
                    );
                    last_err = FetchError::Timeout;
                }
                Err(e) => {
                    tracing::warn!(
                        "Browser error on attempt {}/{}: {}",
                        attempt,
                        self.max_attempts,
                        e
                    );
                    last_err = FetchError::Browser(e);
                }
            }
        }

        tracing::error!(
            "All {} interception attempts failed for '{}'",
            self.max_attempts,
            matcher.url_fragment
        );
        Err(last_err)
    }

    /// Secondary path: fires the request from inside the already-loaded,
    /// already-trusted page instead of via navigation.
    ///
    /// Used for sub-requests (secondary pagination) that do not need to
    /// trigger naturally. No interception or backoff; the same marker-based
    /// blocked/decode classification applies. A small jitter delay precedes
    /// the request to avoid burstiness.
    pub async fn fetch_in_page(
        &self,
        page: &dyn BrowserPage,
        url: &str,
    ) -> Result<Value, FetchError> {
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(500..1_500));
        tokio::time::sleep(jitter).await;

        tracing::debug!("In-page fetch: {}", url);
        // Embed the URL as a JSON string literal so quotes/backslashes in
        // opaque cursor values cannot break out of the script.
        let url_literal = Value::String(url.to_string()).to_string();
        let script = format!(
            r#"(async () => {{
                try {{
                    const response = await fetch({url_literal});
                    const text = await response.text();
                    return {{ status: response.status, text: text }};
                }} catch (e) {{
                    return {{ status: 0, text: e.toString() }};
                }}
            }})()"#
        );

        let result = page.evaluate(&script).await?;
        let status = result.get("status").and_then(Value::as_u64).unwrap_or(0);
        let text = result
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if status != 200 {
            return Err(FetchError::Decode(format!(
                "in-page fetch returned status {}: {}",
                status,
                preview(text)
            )));
        }
        self.decode_body(text)
    }

    /// Classifies a matched response body per the retry taxonomy
    fn decode_body(&self, body: &str) -> Result<Value, FetchError> {
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        match serde_json::from_str(body) {
            Ok(value) => Ok(value),
            Err(_) if body.contains(&self.block_marker) => {
                Err(FetchError::Blocked(self.block_marker.clone()))
            }
            Err(e) => Err(FetchError::Decode(format!("{} ({})", e, preview(body)))),
        }
    }

    fn backoff_delay(&self) -> Duration {
        let (lo, hi) = self.backoff_range_ms;
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }
}

/// First 100 characters of a body, for log/error context
fn preview(body: &str) -> String {
    body.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::InterceptedResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Scripted page: each `wait_for_response` call pops the next outcome
    struct ScriptedPage {
        outcomes: Mutex<VecDeque<Result<InterceptedResponse, BrowserError>>>,
        evaluate_result: Option<Value>,
        evaluated: Mutex<Vec<String>>,
    }

    impl ScriptedPage {
        fn new(outcomes: Vec<Result<InterceptedResponse, BrowserError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                evaluate_result: None,
                evaluated: Mutex::new(Vec::new()),
            }
        }

        fn with_evaluate(value: Value) -> Self {
            Self {
                outcomes: Mutex::new(VecDeque::new()),
                evaluate_result: Some(value),
                evaluated: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BrowserPage for ScriptedPage {
        async fn navigate(&self, _url: &str) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
            self.evaluated.lock().unwrap().push(expression.to_string());
            self.evaluate_result
                .clone()
                .ok_or_else(|| BrowserError::Evaluate("no scripted result".to_string()))
        }

        async fn wait_for_response(
            &self,
            _matcher: &ResponseMatcher,
            timeout: Duration,
        ) -> Result<InterceptedResponse, BrowserError> {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(BrowserError::ResponseTimeout(timeout)))
        }

        async fn current_url(&self) -> Result<String, BrowserError> {
            Ok("about:blank".to_string())
        }
    }

    fn ok_response(body: &str) -> Result<InterceptedResponse, BrowserError> {
        Ok(InterceptedResponse {
            url: "https://example.com/api/search".to_string(),
            status: 200,
            body: body.to_string(),
        })
    }

    fn timeout() -> Result<InterceptedResponse, BrowserError> {
        Err(BrowserError::ResponseTimeout(Duration::from_secs(30)))
    }

    #[tokio::test]
    async fn test_call_succeeds_first_attempt() {
        let page = ScriptedPage::new(vec![ok_response(r#"{"list": [1, 2]}"#)]);
        let client = InterceptClient::default();
        let triggers = AtomicU32::new(0);

        let value = client
            .call(&page, &ResponseMatcher::ok("/api/search"), || {
                triggers.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap();

        assert_eq!(value["list"].as_array().unwrap().len(), 2);
        assert_eq!(triggers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_block_marker_stops_after_two_triggers() {
        // Attempt 1 times out, attempt 2 hits the WAF marker: the blocked
        // classification must end the call without spending the third attempt.
        let page = ScriptedPage::new(vec![timeout(), ok_response("<html>aliyun_waf</html>")]);
        let client = InterceptClient::default();
        let triggers = AtomicU32::new(0);

        let err = client
            .call(&page, &ResponseMatcher::ok("/api/search"), || {
                triggers.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Blocked(_)));
        assert_eq!(triggers.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_body_is_retried_then_succeeds() {
        let page = ScriptedPage::new(vec![ok_response(""), ok_response(r#"{"ok": true}"#)]);
        let client = InterceptClient::default();
        let triggers = AtomicU32::new(0);

        let value = client
            .call(&page, &ResponseMatcher::ok("/api/search"), || {
                triggers.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap();

        assert_eq!(value["ok"], Value::Bool(true));
        assert_eq!(triggers.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_last_error() {
        let page = ScriptedPage::new(vec![
            ok_response("not json"),
            ok_response("not json"),
            ok_response("still not json"),
        ]);
        let client = InterceptClient::default();
        let triggers = AtomicU32::new(0);

        let err = client
            .call(&page, &ResponseMatcher::ok("/api/search"), || {
                triggers.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
        assert_eq!(triggers.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_in_page_decodes_payload() {
        let page = ScriptedPage::with_evaluate(serde_json::json!({
            "status": 200,
            "text": r#"{"comments": []}"#
        }));
        let client = InterceptClient::default();

        let value = client
            .fetch_in_page(&page, "https://example.com/api/comments")
            .await
            .unwrap();
        assert!(value["comments"].as_array().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_in_page_escapes_url_into_script() {
        let page = ScriptedPage::with_evaluate(serde_json::json!({
            "status": 200,
            "text": "{}"
        }));
        let client = InterceptClient::default();

        client
            .fetch_in_page(&page, r#"https://example.com/api?cursor=a"b\c"#)
            .await
            .unwrap();

        let script = page.evaluated.lock().unwrap().last().cloned().unwrap();
        // Quote and backslash survive as JSON escapes inside one literal.
        assert!(script.contains(r#"fetch("https://example.com/api?cursor=a\"b\\c")"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_in_page_classifies_block_marker() {
        let page = ScriptedPage::with_evaluate(serde_json::json!({
            "status": 200,
            "text": "<html>aliyun_waf challenge</html>"
        }));
        let client = InterceptClient::default();

        let err = client
            .fetch_in_page(&page, "https://example.com/api/comments")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Blocked(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_in_page_non_200_is_transient() {
        let page = ScriptedPage::with_evaluate(serde_json::json!({
            "status": 0,
            "text": "TypeError: Failed to fetch"
        }));
        let client = InterceptClient::default();

        let err = client
            .fetch_in_page(&page, "https://example.com/api/comments")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
