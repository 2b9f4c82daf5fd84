//! The incremental-scroll collection loop.
//!
//! Fetching → Extracting → Checking → (Scrolling → Fetching | Done). Any
//! session failure leaves the loop through `?` (the Failed state) without
//! returning partial data.

use super::accumulator::Accumulator;
use crate::core::config::ScrollPolicy;
use crate::core::CollectError;
use crate::extractor::{self, Snapshot};
use crate::scraping::RenderSession;
use crate::types::{CollectOutcome, StopReason};
use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
enum CollectState {
    Fetching,
    Extracting(String),
    Checking,
    Scrolling,
    Done(StopReason),
}

fn log_state(state: &CollectState) {
    match state {
        CollectState::Extracting(html) => debug!("collect_state=Extracting ({} chars)", html.len()),
        other => debug!("collect_state={:?}", other),
    }
}

/// Drives one [`RenderSession`] until the target is met or the policy says stop.
#[derive(Debug, Clone)]
pub struct ScrollCollector {
    policy: ScrollPolicy,
    base_url: Url,
    cancel: Option<watch::Receiver<bool>>,
}

impl ScrollCollector {
    pub fn new(policy: ScrollPolicy, base_url: Url) -> Self {
        Self {
            policy,
            base_url,
            cancel: None,
        }
    }

    /// Stop early (keeping what was collected) once `cancel` reads `true`.
    /// Checked between iterations; the first-content wait and the settle delay
    /// are cut short as soon as it flips.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn policy(&self) -> &ScrollPolicy {
        &self.policy
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is requested. Never resolves without a
    /// receiver or after the sender is gone.
    pub async fn cancel_requested(&self) {
        let Some(mut rx) = self.cancel.clone() else {
            return std::future::pending().await;
        };
        if rx.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    pub async fn collect<S>(&self, session: &mut S, target: usize) -> Result<CollectOutcome, CollectError>
    where
        S: RenderSession + ?Sized,
    {
        let policy = &self.policy;
        let mut accumulator = Accumulator::new();
        let mut fetches = 0u32;
        let mut scroll_attempts = 0u32;
        let mut stale_passes = 0u32;
        let mut state = CollectState::Fetching;

        let stop_reason = loop {
            log_state(&state);
            state = match state {
                CollectState::Fetching => {
                    if fetches == 0 {
                        let appeared = tokio::select! {
                            biased;
                            found = session.wait_for_posts(policy.first_content_timeout) => found?,
                            _ = self.cancel_requested() => {
                                info!("cancelled while waiting for the first post");
                                return Ok(CollectOutcome::stopped(StopReason::Cancelled));
                            }
                        };
                        if !appeared {
                            return Ok(CollectOutcome::empty());
                        }
                    }
                    fetches += 1;
                    CollectState::Extracting(session.content().await?)
                }
                CollectState::Extracting(html) => {
                    let records = extractor::extract(&Snapshot::parse(&html), &self.base_url);
                    let seen = records.len();
                    let added = accumulator.merge(records);
                    if scroll_attempts > 0 && added == 0 {
                        stale_passes += 1;
                    } else {
                        stale_passes = 0;
                    }
                    info!(
                        "pass {}: {} posts on page, {} new, {} total (target {})",
                        fetches,
                        seen,
                        added,
                        accumulator.len(),
                        target
                    );
                    CollectState::Checking
                }
                CollectState::Checking => {
                    if accumulator.len() >= target {
                        CollectState::Done(StopReason::TargetReached)
                    } else if scroll_attempts >= policy.max_scroll_attempts {
                        CollectState::Done(StopReason::ScrollsExhausted)
                    } else if policy
                        .stale_scroll_limit
                        .is_some_and(|limit| stale_passes >= limit)
                    {
                        CollectState::Done(StopReason::NoNewContent)
                    } else if self.cancelled() {
                        CollectState::Done(StopReason::Cancelled)
                    } else {
                        CollectState::Scrolling
                    }
                }
                CollectState::Scrolling => {
                    session.scroll_by(policy.scroll_offset_px).await?;
                    tokio::select! {
                        biased;
                        _ = tokio::time::sleep(policy.settle) => {}
                        _ = self.cancel_requested() => debug!("settle delay cut short"),
                    }
                    scroll_attempts += 1;
                    CollectState::Fetching
                }
                CollectState::Done(reason) => break reason,
            };
        };

        info!(
            "collection done: {:?} after {} fetches / {} scrolls, {} unique posts",
            stop_reason,
            fetches,
            scroll_attempts,
            accumulator.len()
        );

        Ok(CollectOutcome {
            posts: accumulator.into_top(target),
            fetches,
            scroll_attempts,
            stop_reason,
        })
    }
}
