//! Native browser management using `chromiumoxide`.
//!
//! * Finding a usable browser executable (explicit path, `PATH`, install locations).
//! * Building the headless launch config used by [`super::session::ChromeBackend`].

use crate::core::config::BrowserSettings;
use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use std::path::Path;

// ── Browser executable discovery ─────────────────────────────────────────────

/// Executable names looked up on `PATH`, most preferred first.
const PATH_CANDIDATES: [&str; 5] = [
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "brave-browser",
];

#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

#[cfg(target_os = "windows")]
const INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const INSTALL_PATHS: &[&str] = &[];

/// Find a Chromium-family executable: `explicit` if it exists, then the first
/// `PATH` hit, then a well-known install location.
pub fn find_chrome_executable(explicit: Option<&str>) -> Option<String> {
    if let Some(p) = explicit.filter(|p| Path::new(p).exists()) {
        return Some(p.to_string());
    }

    PATH_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
        .map(|p| p.to_string_lossy().to_string())
        .or_else(|| {
            INSTALL_PATHS
                .iter()
                .find(|p| Path::new(p).exists())
                .map(|p| p.to_string())
        })
}

// ── Headless browser config builder ──────────────────────────────────────────

/// Build a `BrowserConfig` for headless operation.
///
/// `--disable-blink-features=AutomationControlled` hides the
/// `navigator.webdriver` flag; the sandbox flags keep launches working in
/// containers and CI.
pub fn build_headless_config(exe: &str, settings: &BrowserSettings) -> Result<BrowserConfig> {
    BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: settings.width,
            height: settings.height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(settings.width, settings.height)
        .request_timeout(settings.navigation_timeout)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", settings.user_agent))
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}
