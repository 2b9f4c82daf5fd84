use crate::core::config::ENV_COOKIES;
use crate::types::ErrorResponse;
use thiserror::Error;

/// Failures raised by a render session (browser side).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no browser found; install Brave, Chrome, or Chromium (or set CHROME_EXECUTABLE)")]
    BrowserUnavailable,

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("session cookie injection failed: {0}")]
    CookieInjection(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("navigation timed out after {0}s")]
    NavigationTimeout(u64),

    #[error("page interaction failed: {0}")]
    Page(String),
}

/// Terminal failures of a collection run. None of these carry partial data.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{} environment variable not found", ENV_COOKIES)]
    MissingCredentials,

    #[error("invalid search url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CollectError {
    /// Map onto the structured payload printed on stdout.
    pub fn to_response(&self) -> ErrorResponse {
        match self {
            CollectError::MissingCredentials => ErrorResponse::new(self.to_string()),
            CollectError::Session(SessionError::NavigationTimeout(_))
            | CollectError::Session(SessionError::Navigation(_)) => {
                ErrorResponse::with_details("Page load timeout", self.to_string())
            }
            CollectError::Session(SessionError::BrowserUnavailable)
            | CollectError::Session(SessionError::Launch(_)) => {
                ErrorResponse::with_details("Browser launch failed", self.to_string())
            }
            CollectError::Session(SessionError::CookieInjection(_))
            | CollectError::Session(SessionError::Page(_))
            | CollectError::InvalidUrl(_) => {
                ErrorResponse::with_details("Scraper error", self.to_string())
            }
        }
    }
}
