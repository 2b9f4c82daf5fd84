use clap::error::ErrorKind;
use clap::Parser;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use timeline_scout::config::{ScoutConfig, DEFAULT_MAX_RESULTS, ENV_COOKIES};
use timeline_scout::{
    search_with_cookies, ChromeBackend, CollectError, ErrorResponse, PostRecord, ScrollCollector,
};

const USAGE_ERROR: &str = "Usage: timeline-scout <query> [max_results]";

#[derive(Parser, Debug)]
#[command(
    name = "timeline-scout",
    about = "Collect live-search posts with a headless browser and print them as JSON",
    version
)]
struct Cli {
    /// Search query.
    query: String,

    /// Maximum number of posts to return.
    #[arg(default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,
}

/// stdout carries exactly one JSON value per invocation.
fn emit<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(e) => println!(
            r#"{{"error":"Serialization error","details":{:?}}}"#,
            e.to_string()
        ),
    }
}

async fn run(cli: Cli, cancel: watch::Receiver<bool>) -> anyhow::Result<Vec<PostRecord>> {
    let config = ScoutConfig::default();
    let raw_cookies = std::env::var(ENV_COOKIES).unwrap_or_default();

    let base_url = url::Url::parse(&config.resolve_base_url())?;
    let collector = ScrollCollector::new(config.scroll_policy(), base_url).with_cancel(cancel);
    let backend = ChromeBackend::new(config.browser_settings());

    let outcome = search_with_cookies(
        &backend,
        &collector,
        &raw_cookies,
        &config.resolve_cookie_domain(),
        &cli.query,
        cli.max_results,
    )
    .await?;

    info!(
        "returning {} posts ({:?})",
        outcome.posts.len(),
        outcome.stop_reason
    );
    Ok(outcome.posts)
}

fn failure_response(err: &anyhow::Error) -> ErrorResponse {
    match err.downcast_ref::<CollectError>() {
        Some(e) => e.to_response(),
        None => ErrorResponse::with_details("Scraper error", format!("{:#}", err)),
    }
}

#[tokio::main]
async fn main() {
    // stdout is reserved for the JSON payload; logs go to stderr.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .try_init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            emit(&ErrorResponse::with_details(USAGE_ERROR, e.to_string().trim()));
            return;
        }
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping with what has been collected");
            let _ = cancel_tx.send(true);
        }
    });

    match tokio::spawn(run(cli, cancel_rx)).await {
        Ok(Ok(posts)) => emit(&posts),
        Ok(Err(e)) => {
            error!("search failed: {:#}", e);
            emit(&failure_response(&e));
        }
        Err(e) => {
            error!("search task aborted: {}", e);
            emit(&ErrorResponse::with_details("Scraper error", e.to_string()));
        }
    }
}
