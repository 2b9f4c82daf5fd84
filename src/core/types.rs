use serde::{Deserialize, Serialize};

/// Sentinel display name used when the author container is missing.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";
/// Sentinel handle used when no `@handle` segment can be found.
pub const UNKNOWN_HANDLE: &str = "unknown";

/// One collected timeline post.
///
/// Field names on the wire follow the shape downstream consumers already
/// ingest (`author.name`, `author.screen_name`, `metrics.retweets`, ...).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PostRecord {
    pub id: String,
    pub text: String,
    /// Hashtag labels found in the body, in document order.
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub created_at: String,
    pub author: Author,
    #[serde(default)]
    pub metrics: Metrics,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Author {
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "screen_name")]
    pub handle: String,
    #[serde(rename = "profile_image_url")]
    pub avatar_url: String,
}

impl Default for Author {
    fn default() -> Self {
        Self {
            display_name: UNKNOWN_DISPLAY_NAME.to_string(),
            handle: UNKNOWN_HANDLE.to_string(),
            avatar_url: String::new(),
        }
    }
}

/// Engagement counters. Not extracted yet; always zero.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub likes: u64,
    #[serde(rename = "retweets")]
    pub reshares: u64,
    pub replies: u64,
    pub quotes: u64,
    pub views: u64,
}

/// Structured failure payload printed instead of a post list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Why a collection run stopped.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Enough unique posts were accumulated.
    TargetReached,
    /// The scroll budget ran out first.
    ScrollsExhausted,
    /// Consecutive scroll passes produced nothing new.
    NoNewContent,
    /// No post container appeared before the first-content deadline.
    NoResults,
    /// The caller asked the run to stop early.
    Cancelled,
}

/// Result of a finished (`Done`) collection run.
#[derive(Debug, Serialize, Clone)]
pub struct CollectOutcome {
    pub posts: Vec<PostRecord>,
    pub fetches: u32,
    pub scroll_attempts: u32,
    pub stop_reason: StopReason,
}

impl CollectOutcome {
    /// No posts were captured; the run ended for `stop_reason`.
    pub fn stopped(stop_reason: StopReason) -> Self {
        Self {
            posts: Vec::new(),
            fetches: 0,
            scroll_attempts: 0,
            stop_reason,
        }
    }

    pub fn empty() -> Self {
        Self::stopped(StopReason::NoResults)
    }
}
