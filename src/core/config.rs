use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ScoutConfig: in-process overrides with env-var fallback. Nothing is read from disk.
// ---------------------------------------------------------------------------

pub const ENV_COOKIES: &str = "TWITTER_COOKIES";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_MAX_SCROLLS: &str = "SCOUT_MAX_SCROLLS";
pub const ENV_SCROLL_OFFSET_PX: &str = "SCOUT_SCROLL_OFFSET_PX";
pub const ENV_SETTLE_MS: &str = "SCOUT_SETTLE_MS";
pub const ENV_NAV_TIMEOUT_MS: &str = "SCOUT_NAV_TIMEOUT_MS";
pub const ENV_FIRST_CONTENT_TIMEOUT_MS: &str = "SCOUT_FIRST_CONTENT_TIMEOUT_MS";
pub const ENV_STALE_SCROLL_LIMIT: &str = "SCOUT_STALE_SCROLL_LIMIT";
pub const ENV_USER_AGENT: &str = "SCOUT_USER_AGENT";

pub const DEFAULT_BASE_URL: &str = "https://x.com";
pub const DEFAULT_COOKIE_DOMAIN: &str = ".x.com";
pub const DEFAULT_MAX_RESULTS: usize = 70;
pub const DEFAULT_MAX_SCROLLS: u32 = 20;
pub const DEFAULT_SCROLL_OFFSET_PX: u32 = 3000;
pub const DEFAULT_SETTLE_MS: u64 = 2500;
pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_FIRST_CONTENT_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_VIEWPORT: (u32, u32) = (1280, 800);
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Run configuration.
///
/// Every field is an optional in-process override; absent fields fall back to
/// an environment variable and then to a built-in default (see the `resolve_*`
/// methods). The binary runs with `ScoutConfig::default()`, so only the
/// environment can change its behaviour.
#[derive(Default, Clone, Debug)]
pub struct ScoutConfig {
    /// Site root used for the search URL and for absolutizing post links.
    pub base_url: Option<String>,
    /// Domain attribute applied to every injected cookie.
    pub cookie_domain: Option<String>,
    /// Hard cap on scroll commands per run. Default: 20.
    pub max_scroll_attempts: Option<u32>,
    /// Vertical offset per scroll command, in CSS pixels. Default: 3000.
    pub scroll_offset_px: Option<u32>,
    /// Pause after each scroll so lazy content can render. Default: 2500 ms.
    pub settle_ms: Option<u64>,
    /// Navigation deadline for the initial page load. Default: 60 000 ms.
    pub navigation_timeout_ms: Option<u64>,
    /// How long to wait for the first post container. Default: 20 000 ms.
    pub first_content_timeout_ms: Option<u64>,
    /// Stop after this many consecutive scrolls that add nothing. Unset = disabled.
    pub stale_scroll_limit: Option<u32>,
    pub user_agent: Option<String>,
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
    /// Explicit browser executable; otherwise auto-discovered.
    pub chrome_executable: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ScoutConfig {
    pub fn resolve_base_url(&self) -> String {
        non_blank(&self.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn resolve_cookie_domain(&self) -> String {
        non_blank(&self.cookie_domain).unwrap_or_else(|| DEFAULT_COOKIE_DOMAIN.to_string())
    }

    /// Max scrolls: override → `SCOUT_MAX_SCROLLS` env → 20.
    pub fn resolve_max_scroll_attempts(&self) -> u32 {
        self.max_scroll_attempts
            .or_else(|| env_parse(ENV_MAX_SCROLLS))
            .unwrap_or(DEFAULT_MAX_SCROLLS)
    }

    pub fn resolve_scroll_offset_px(&self) -> u32 {
        self.scroll_offset_px
            .or_else(|| env_parse(ENV_SCROLL_OFFSET_PX))
            .unwrap_or(DEFAULT_SCROLL_OFFSET_PX)
    }

    pub fn resolve_settle(&self) -> Duration {
        Duration::from_millis(
            self.settle_ms
                .or_else(|| env_parse(ENV_SETTLE_MS))
                .unwrap_or(DEFAULT_SETTLE_MS),
        )
    }

    pub fn resolve_navigation_timeout(&self) -> Duration {
        Duration::from_millis(
            self.navigation_timeout_ms
                .or_else(|| env_parse(ENV_NAV_TIMEOUT_MS))
                .unwrap_or(DEFAULT_NAV_TIMEOUT_MS),
        )
    }

    pub fn resolve_first_content_timeout(&self) -> Duration {
        Duration::from_millis(
            self.first_content_timeout_ms
                .or_else(|| env_parse(ENV_FIRST_CONTENT_TIMEOUT_MS))
                .unwrap_or(DEFAULT_FIRST_CONTENT_TIMEOUT_MS),
        )
    }

    /// `0` is treated the same as unset.
    pub fn resolve_stale_scroll_limit(&self) -> Option<u32> {
        self.stale_scroll_limit
            .or_else(|| env_parse(ENV_STALE_SCROLL_LIMIT))
            .filter(|n| *n > 0)
    }

    pub fn resolve_user_agent(&self) -> String {
        non_blank(&self.user_agent)
            .or_else(|| env_string(ENV_USER_AGENT))
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    pub fn resolve_viewport(&self) -> (u32, u32) {
        (
            self.viewport_width.unwrap_or(DEFAULT_VIEWPORT.0),
            self.viewport_height.unwrap_or(DEFAULT_VIEWPORT.1),
        )
    }

    /// Override → `CHROME_EXECUTABLE` env var, only when the path exists.
    pub fn resolve_chrome_executable(&self) -> Option<String> {
        non_blank(&self.chrome_executable)
            .or_else(|| env_string(ENV_CHROME_EXECUTABLE))
            .filter(|p| Path::new(p).exists())
    }

    /// Scroll-loop policy derived from this config.
    pub fn scroll_policy(&self) -> ScrollPolicy {
        ScrollPolicy {
            max_scroll_attempts: self.resolve_max_scroll_attempts(),
            scroll_offset_px: self.resolve_scroll_offset_px(),
            settle: self.resolve_settle(),
            first_content_timeout: self.resolve_first_content_timeout(),
            stale_scroll_limit: self.resolve_stale_scroll_limit(),
        }
    }

    /// Browser launch settings derived from this config.
    pub fn browser_settings(&self) -> BrowserSettings {
        let (width, height) = self.resolve_viewport();
        BrowserSettings {
            executable: self.resolve_chrome_executable(),
            user_agent: self.resolve_user_agent(),
            width,
            height,
            navigation_timeout: self.resolve_navigation_timeout(),
        }
    }
}

/// Termination and pacing knobs for the scroll-collection loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrollPolicy {
    pub max_scroll_attempts: u32,
    pub scroll_offset_px: u32,
    pub settle: Duration,
    pub first_content_timeout: Duration,
    pub stale_scroll_limit: Option<u32>,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            max_scroll_attempts: DEFAULT_MAX_SCROLLS,
            scroll_offset_px: DEFAULT_SCROLL_OFFSET_PX,
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            first_content_timeout: Duration::from_millis(DEFAULT_FIRST_CONTENT_TIMEOUT_MS),
            stale_scroll_limit: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BrowserSettings {
    pub executable: Option<String>,
    pub user_agent: String,
    pub width: u32,
    pub height: u32,
    pub navigation_timeout: Duration,
}
