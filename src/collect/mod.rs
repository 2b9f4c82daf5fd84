pub mod accumulator;
pub mod scroll_loop;

pub use accumulator::Accumulator;
pub use scroll_loop::ScrollCollector;

use crate::core::CollectError;
use crate::scraping::{Credentials, RenderBackend, RenderSession};
use crate::types::{CollectOutcome, StopReason};
use tracing::{info, warn};
use url::Url;

/// Live-search URL for `query` under `base_url`.
pub fn search_url(base_url: &Url, query: &str) -> Result<Url, CollectError> {
    let mut url = base_url.join("/search")?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("src", "typed_query")
        .append_pair("f", "live");
    Ok(url)
}

/// Open a session for `query`, collect up to `max_results` posts, and close
/// the session on every exit path.
pub async fn run_search<B: RenderBackend>(
    backend: &B,
    collector: &ScrollCollector,
    credentials: &Credentials,
    query: &str,
    max_results: usize,
) -> Result<CollectOutcome, CollectError> {
    let url = search_url(collector.base_url(), query)?;
    info!(
        "searching {:?} (max {} results, {} cookies)",
        query,
        max_results,
        credentials.len()
    );

    let mut session = tokio::select! {
        biased;
        opened = backend.open(&url, credentials) => opened?,
        _ = collector.cancel_requested() => {
            info!("cancelled before the search page loaded");
            return Ok(CollectOutcome::stopped(StopReason::Cancelled));
        }
    };
    let result = collector.collect(&mut session, max_results).await;
    session.close().await;

    if let Err(e) = &result {
        warn!("collection failed: {}", e);
    }
    result
}

/// Check the raw cookie string before anything is launched, then search.
///
/// A missing or blank `raw_cookies` fails with
/// [`CollectError::MissingCredentials`] and `backend` is never opened.
pub async fn search_with_cookies<B: RenderBackend>(
    backend: &B,
    collector: &ScrollCollector,
    raw_cookies: &str,
    cookie_domain: &str,
    query: &str,
    max_results: usize,
) -> Result<CollectOutcome, CollectError> {
    let credentials = Credentials::from_raw(raw_cookies, cookie_domain)?;
    run_search(backend, collector, &credentials, query, max_results).await
}
