//! Scroll-collection loop against a scripted render backend.

use async_trait::async_trait;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use timeline_scout::config::ScrollPolicy;
use timeline_scout::{
    run_search, search_with_cookies, CollectError, Credentials, RenderBackend, RenderSession,
    ScrollCollector, SessionError, StopReason,
};
use tokio::sync::watch;
use url::Url;

fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn post_html(id: u32) -> String {
    format!(
        r#"<article data-testid="tweet">
             <div data-testid="Tweet-User-Avatar"><img src="https://pbs.twimg.com/crab.jpg"></div>
             <div data-testid="User-Name"><span>Crab</span><span>@crab</span><a href="/crab/status/{id}"><time datetime="2024-05-13T09:00:00.000Z">1h</time></a></div>
             <div data-testid="tweetText">post number {id}</div>
           </article>"#
    )
}

fn unlinked_post_html(text: &str) -> String {
    format!(
        r#"<article data-testid="tweet"><div data-testid="User-Name"><span>Crab</span><span>@crab</span></div><div data-testid="tweetText">{text}</div></article>"#
    )
}

fn page(ids: Range<u32>) -> String {
    let body: String = ids.map(post_html).collect();
    format!("<html><body><main>{body}</main></body></html>")
}

#[derive(Default)]
struct Probe {
    opened: AtomicU32,
    scrolls: AtomicU32,
    fetches: AtomicU32,
    closed: AtomicBool,
}

struct ScriptedSession {
    pages: Vec<String>,
    cursor: usize,
    posts_appear: bool,
    first_content_stalls: bool,
    fail_content_after: Option<u32>,
    probe: Arc<Probe>,
}

const FOREVER: Duration = Duration::from_secs(3600);

#[async_trait]
impl RenderSession for ScriptedSession {
    async fn wait_for_posts(&mut self, _timeout: Duration) -> Result<bool, SessionError> {
        if self.first_content_stalls {
            tokio::time::sleep(FOREVER).await;
        }
        Ok(self.posts_appear)
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        let n = self.probe.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_content_after.is_some_and(|limit| n >= limit) {
            return Err(SessionError::Page("target crashed".into()));
        }
        let idx = self.cursor.min(self.pages.len() - 1);
        Ok(self.pages[idx].clone())
    }

    async fn scroll_by(&mut self, offset_px: u32) -> Result<(), SessionError> {
        assert_eq!(offset_px, 3000);
        self.probe.scrolls.fetch_add(1, Ordering::SeqCst);
        self.cursor += 1;
        Ok(())
    }

    async fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct ScriptedBackend {
    pages: Vec<String>,
    no_posts: bool,
    navigation_times_out: bool,
    navigation_stalls: bool,
    cookies_rejected: bool,
    first_content_stalls: bool,
    fail_content_after: Option<u32>,
    probe: Arc<Probe>,
}

impl ScriptedBackend {
    fn with_pages(pages: Vec<String>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }
}

#[async_trait]
impl RenderBackend for ScriptedBackend {
    type Session = ScriptedSession;

    async fn open(
        &self,
        url: &Url,
        _credentials: &Credentials,
    ) -> Result<ScriptedSession, SessionError> {
        assert!(url.as_str().starts_with("https://x.com/search?q="));
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        if self.cookies_rejected {
            return Err(SessionError::CookieInjection("Network.setCookies rejected".into()));
        }
        if self.navigation_stalls {
            tokio::time::sleep(FOREVER).await;
        }
        if self.navigation_times_out {
            return Err(SessionError::NavigationTimeout(60));
        }
        Ok(ScriptedSession {
            pages: self.pages.clone(),
            cursor: 0,
            posts_appear: !self.no_posts,
            first_content_stalls: self.first_content_stalls,
            fail_content_after: self.fail_content_after,
            probe: Arc::clone(&self.probe),
        })
    }
}

fn fast_policy(max_scroll_attempts: u32) -> ScrollPolicy {
    ScrollPolicy {
        max_scroll_attempts,
        settle: Duration::ZERO,
        ..Default::default()
    }
}

fn collector(policy: ScrollPolicy) -> ScrollCollector {
    ScrollCollector::new(policy, Url::parse("https://x.com").unwrap())
}

fn creds() -> Credentials {
    Credentials::parse("auth_token=abc; ct0=def", ".x.com")
}

/// Flip the cancel flag shortly after the run has started.
fn cancel_soon() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(true);
    });
    rx
}

#[tokio::test]
async fn test_target_met_on_first_pass_truncates_without_scrolling() {
    init_logger();
    let backend = ScriptedBackend::with_pages(vec![page(0..12)]);

    let outcome = run_search(&backend, &collector(fast_policy(20)), &creds(), "rust", 10)
        .await
        .unwrap();

    assert_eq!(outcome.posts.len(), 10);
    let ids: Vec<String> = outcome.posts.iter().map(|p| p.id.clone()).collect();
    let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    assert_eq!(ids, expected);
    assert_eq!(outcome.fetches, 1);
    assert_eq!(outcome.scroll_attempts, 0);
    assert_eq!(outcome.stop_reason, StopReason::TargetReached);
    assert_eq!(backend.probe.scrolls.load(Ordering::SeqCst), 0);
    assert!(backend.probe.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_growing_feed_accumulates_across_scrolls() {
    init_logger();
    let backend = ScriptedBackend::with_pages(vec![page(0..5), page(0..10), page(3..15)]);

    let outcome = run_search(&backend, &collector(fast_policy(20)), &creds(), "rust", 12)
        .await
        .unwrap();

    assert_eq!(outcome.scroll_attempts, 2);
    assert_eq!(outcome.fetches, 3);
    assert_eq!(outcome.posts.len(), 12);
    assert_eq!(outcome.posts[11].id, "11");
    assert_eq!(outcome.stop_reason, StopReason::TargetReached);
}

#[tokio::test]
async fn test_virtualized_feed_keeps_first_seen_order() {
    init_logger();
    // Earlier items leave the DOM as the viewport moves down.
    let backend = ScriptedBackend::with_pages(vec![page(0..4), page(2..7), page(6..9)]);

    let outcome = run_search(&backend, &collector(fast_policy(2)), &creds(), "rust", 50)
        .await
        .unwrap();

    let ids: Vec<&str> = outcome.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "1", "2", "3", "4", "5", "6", "7", "8"]);
    assert_eq!(outcome.stop_reason, StopReason::ScrollsExhausted);
}

#[tokio::test]
async fn test_stalled_feed_stops_at_scroll_cap() {
    init_logger();
    let backend = ScriptedBackend::with_pages(vec![page(0..3)]);

    let outcome = run_search(&backend, &collector(fast_policy(5)), &creds(), "rust", 70)
        .await
        .unwrap();

    assert_eq!(outcome.posts.len(), 3);
    assert_eq!(outcome.scroll_attempts, 5);
    assert_eq!(backend.probe.scrolls.load(Ordering::SeqCst), 5);
    assert_eq!(outcome.fetches, 6);
    assert_eq!(outcome.stop_reason, StopReason::ScrollsExhausted);
    assert!(backend.probe.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_output_never_exceeds_target() {
    init_logger();
    for target in [0usize, 1, 7, 25] {
        let backend = ScriptedBackend::with_pages(vec![page(0..8), page(0..16), page(0..30)]);
        let outcome = run_search(&backend, &collector(fast_policy(4)), &creds(), "q", target)
            .await
            .unwrap();
        assert!(outcome.posts.len() <= target, "target {target}");
        assert!(outcome.scroll_attempts <= 4);
    }
}

#[tokio::test]
async fn test_stale_scroll_limit_stops_early() {
    init_logger();
    let backend = ScriptedBackend::with_pages(vec![page(0..3)]);
    let policy = ScrollPolicy {
        stale_scroll_limit: Some(2),
        ..fast_policy(20)
    };

    let outcome = run_search(&backend, &collector(policy), &creds(), "rust", 70)
        .await
        .unwrap();

    assert_eq!(outcome.scroll_attempts, 2);
    assert_eq!(outcome.stop_reason, StopReason::NoNewContent);
    assert_eq!(outcome.posts.len(), 3);
}

#[tokio::test]
async fn test_empty_feed_is_not_an_error() {
    init_logger();
    let backend = ScriptedBackend {
        pages: vec![page(0..0)],
        no_posts: true,
        ..Default::default()
    };

    let outcome = run_search(&backend, &collector(fast_policy(20)), &creds(), "nothing", 70)
        .await
        .unwrap();

    assert!(outcome.posts.is_empty());
    assert_eq!(outcome.stop_reason, StopReason::NoResults);
    assert_eq!(backend.probe.fetches.load(Ordering::SeqCst), 0);
    assert!(backend.probe.closed.load(Ordering::SeqCst));
    assert_eq!(serde_json::to_string(&outcome.posts).unwrap(), "[]");
}

#[tokio::test]
async fn test_navigation_timeout_surfaces_single_error() {
    init_logger();
    let backend = ScriptedBackend {
        pages: vec![page(0..5)],
        navigation_times_out: true,
        ..Default::default()
    };

    let err = run_search(&backend, &collector(fast_policy(20)), &creds(), "rust", 70)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CollectError::Session(SessionError::NavigationTimeout(60))
    ));
    let resp = err.to_response();
    assert_eq!(resp.error, "Page load timeout");
    assert!(resp.details.unwrap().contains("timed out"));
    assert_eq!(backend.probe.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_mid_run_failure_returns_no_partial_data_and_closes() {
    init_logger();
    let backend = ScriptedBackend {
        pages: vec![page(0..5), page(0..10)],
        fail_content_after: Some(1),
        ..Default::default()
    };

    let result = run_search(&backend, &collector(fast_policy(20)), &creds(), "rust", 70).await;

    assert!(matches!(
        result,
        Err(CollectError::Session(SessionError::Page(_)))
    ));
    assert!(backend.probe.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_cancellation_keeps_partial_results() {
    init_logger();
    let backend = ScriptedBackend::with_pages(vec![page(0..5), page(0..10)]);
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let outcome = run_search(
        &backend,
        &collector(fast_policy(20)).with_cancel(rx),
        &creds(),
        "rust",
        70,
    )
    .await
    .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert_eq!(outcome.scroll_attempts, 0);
    assert_eq!(outcome.posts.len(), 5);
    assert!(backend.probe.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_unlinked_posts_dedupe_across_passes() {
    init_logger();
    let first = format!(
        "<html><body>{}{}</body></html>",
        unlinked_post_html("alpha"),
        unlinked_post_html("beta")
    );
    let second = format!(
        "<html><body>{}{}</body></html>",
        unlinked_post_html("beta"),
        unlinked_post_html("gamma")
    );
    let backend = ScriptedBackend::with_pages(vec![first, second]);

    let outcome = run_search(&backend, &collector(fast_policy(1)), &creds(), "rust", 70)
        .await
        .unwrap();

    let texts: Vec<&str> = outcome.posts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
    assert!(outcome.posts.iter().all(|p| p.url.is_empty()));
}

#[tokio::test]
async fn test_rejected_cookies_are_an_error_not_an_empty_feed() {
    init_logger();
    let backend = ScriptedBackend {
        pages: vec![page(0..5)],
        cookies_rejected: true,
        ..Default::default()
    };

    let err = run_search(&backend, &collector(fast_policy(20)), &creds(), "rust", 70)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CollectError::Session(SessionError::CookieInjection(_))
    ));
    let resp = serde_json::to_value(err.to_response()).unwrap();
    assert_eq!(resp["error"], "Scraper error");
    assert!(resp["details"].as_str().unwrap().contains("cookie injection failed"));
    assert_eq!(backend.probe.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_interrupts_navigation() {
    init_logger();
    let backend = ScriptedBackend {
        pages: vec![page(0..5)],
        navigation_stalls: true,
        ..Default::default()
    };
    let collector = collector(fast_policy(20)).with_cancel(cancel_soon());

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        run_search(&backend, &collector, &creds(), "rust", 70),
    )
    .await
    .expect("cancel should end the navigation wait")
    .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert!(outcome.posts.is_empty());
    assert_eq!(backend.probe.opened.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_interrupts_first_content_wait() {
    init_logger();
    let backend = ScriptedBackend {
        pages: vec![page(0..5)],
        first_content_stalls: true,
        ..Default::default()
    };
    let collector = collector(fast_policy(20)).with_cancel(cancel_soon());

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        run_search(&backend, &collector, &creds(), "rust", 70),
    )
    .await
    .expect("cancel should end the first-content wait")
    .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert!(outcome.posts.is_empty());
    assert_eq!(backend.probe.fetches.load(Ordering::SeqCst), 0);
    assert!(backend.probe.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_cancel_cuts_settle_delay_short() {
    init_logger();
    let backend = ScriptedBackend::with_pages(vec![page(0..5), page(0..10), page(0..15)]);
    let policy = ScrollPolicy {
        settle: FOREVER,
        ..fast_policy(20)
    };
    let collector = collector(policy).with_cancel(cancel_soon());

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        run_search(&backend, &collector, &creds(), "rust", 70),
    )
    .await
    .expect("cancel should end the settle delay")
    .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert_eq!(outcome.scroll_attempts, 1);
    assert_eq!(outcome.fetches, 2);
    assert_eq!(outcome.posts.len(), 10);
    assert!(backend.probe.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_missing_credentials_never_open_a_session() {
    init_logger();
    let backend = ScriptedBackend::with_pages(vec![page(0..5)]);

    for raw in ["", "   "] {
        let err = search_with_cookies(
            &backend,
            &collector(fast_policy(20)),
            raw,
            ".x.com",
            "rust",
            70,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CollectError::MissingCredentials));
    }
    assert_eq!(backend.probe.opened.load(Ordering::SeqCst), 0);

    let outcome = search_with_cookies(
        &backend,
        &collector(fast_policy(20)),
        "auth_token=abc",
        ".x.com",
        "rust",
        3,
    )
    .await
    .unwrap();
    assert_eq!(outcome.posts.len(), 3);
    assert_eq!(backend.probe.opened.load(Ordering::SeqCst), 1);
}

#[test]
fn test_missing_credentials_never_reach_backend() {
    let err = Credentials::from_raw("", ".x.com").unwrap_err();
    assert!(matches!(err, CollectError::MissingCredentials));
    assert_eq!(
        serde_json::to_value(err.to_response()).unwrap(),
        serde_json::json!({"error": "TWITTER_COOKIES environment variable not found"})
    );
}
