//! Render sessions: the only surface the collection loop uses to talk to a
//! browser.

use super::browser_manager;
use super::cookies::{self, Credentials};
use crate::core::config::BrowserSettings;
use crate::core::SessionError;
use crate::extractor::Marker;
use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A navigable page owned by exactly one collection run.
#[async_trait]
pub trait RenderSession: Send {
    /// Wait until at least one post container is present. `Ok(false)` means
    /// the deadline passed without one (an empty feed, not a failure).
    async fn wait_for_posts(&mut self, timeout: Duration) -> Result<bool, SessionError>;

    /// Current rendered HTML.
    async fn content(&mut self) -> Result<String, SessionError>;

    /// Advance the viewport by `offset_px` CSS pixels.
    async fn scroll_by(&mut self, offset_px: u32) -> Result<(), SessionError>;

    /// Release the page and its browser. Must be safe to call on every exit path.
    async fn close(&mut self);
}

/// Opens [`RenderSession`]s.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    type Session: RenderSession;

    /// Launch, inject `credentials`, and navigate to `url`.
    async fn open(&self, url: &Url, credentials: &Credentials)
        -> Result<Self::Session, SessionError>;
}

/// Headless Chromium backend.
#[derive(Debug, Clone)]
pub struct ChromeBackend {
    settings: BrowserSettings,
}

impl ChromeBackend {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

pub struct ChromeSession {
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    async fn shutdown(browser: &mut Browser, handler: &JoinHandle<()>) {
        // Best-effort cleanup
        if let Err(e) = browser.close().await {
            warn!("Browser close error (non-fatal): {}", e);
        }
        handler.abort();
    }
}

#[async_trait]
impl RenderBackend for ChromeBackend {
    type Session = ChromeSession;

    async fn open(
        &self,
        url: &Url,
        credentials: &Credentials,
    ) -> Result<ChromeSession, SessionError> {
        let exe = browser_manager::find_chrome_executable(self.settings.executable.as_deref())
            .ok_or(SessionError::BrowserUnavailable)?;

        info!("🌐 Launching headless browser ({})", exe);
        let config = browser_manager::build_headless_config(&exe, &self.settings)
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(format!("{} ({})", e, exe)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let nav_timeout = self.settings.navigation_timeout;
        let opened: Result<Page, SessionError> = async {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| SessionError::Launch(format!("failed to open tab: {}", e)))?;

            cookies::inject_into_page(&page, credentials)
                .await
                .map_err(|e| SessionError::CookieInjection(e.to_string()))?;

            info!("Navigating to: {}", url);
            let navigated = tokio::time::timeout(nav_timeout, page.goto(url.as_str()))
                .await
                .map(|r| r.map(|_| ()));
            match navigated {
                Ok(Ok(())) => Ok(page),
                Ok(Err(e)) => Err(SessionError::Navigation(e.to_string())),
                Err(_) => Err(SessionError::NavigationTimeout(nav_timeout.as_secs())),
            }
        }
        .await;

        match opened {
            Ok(page) => Ok(ChromeSession {
                browser: Some(browser),
                page,
                handler,
            }),
            Err(e) => {
                ChromeSession::shutdown(&mut browser, &handler).await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn wait_for_posts(&mut self, timeout: Duration) -> Result<bool, SessionError> {
        let selector = Marker::PostContainer.css();
        let start = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                info!(
                    "first post container after {}ms",
                    start.elapsed().as_millis()
                );
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                warn!(
                    "no post container within {}ms; treating feed as empty",
                    timeout.as_millis()
                );
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        self.page
            .content()
            .await
            .map_err(|e| SessionError::Page(format!("failed to get page content: {}", e)))
    }

    async fn scroll_by(&mut self, offset_px: u32) -> Result<(), SessionError> {
        self.page
            .evaluate(format!("window.scrollBy(0, {});", offset_px))
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Page(format!("scroll failed: {}", e)))
    }

    async fn close(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            Self::shutdown(&mut browser, &self.handler).await;
            info!("🛑 Browser session closed");
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Drop cannot await; hand the browser to the runtime if close() was skipped.
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        self.handler.abort();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = browser.close().await;
            });
        }
    }
}
