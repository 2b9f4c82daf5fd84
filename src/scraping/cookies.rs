//! Session cookies: parse the raw `name=value; ...` credential string and
//! inject the result into a CDP page before navigation.

use crate::core::config::ENV_COOKIES;
use crate::core::CollectError;
use serde::Serialize;
use tracing::{info, warn};

/// One cookie in the shape CDP `Network.setCookies` accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieDescriptor {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

/// Opaque credential set handed to a render backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    cookies: Vec<CookieDescriptor>,
}

impl Credentials {
    pub fn new(cookies: Vec<CookieDescriptor>) -> Self {
        Self { cookies }
    }

    /// Parse a raw cookie header string, scoping every cookie to `domain`.
    pub fn parse(raw: &str, domain: &str) -> Self {
        Self::new(parse_cookie_string(raw, domain))
    }

    /// A blank `raw` (an unset `TWITTER_COOKIES`) is a precondition failure;
    /// a present but partly malformed one is not.
    pub fn from_raw(raw: &str, domain: &str) -> Result<Self, CollectError> {
        if raw.trim().is_empty() {
            return Err(CollectError::MissingCredentials);
        }
        let creds = Self::parse(raw, domain);
        if creds.is_empty() {
            warn!("{} is set but contains no well-formed cookies", ENV_COOKIES);
        }
        Ok(creds)
    }

    pub fn cookies(&self) -> &[CookieDescriptor] {
        &self.cookies
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Split `name1=value1; name2=value2` into descriptors.
///
/// Pairs are separated by `;` and split on the first `=`; pairs without `=`
/// or with an empty name are skipped.
pub fn parse_cookie_string(raw: &str, domain: &str) -> Vec<CookieDescriptor> {
    raw.split(';')
        .filter_map(|item| {
            let (name, value) = item.trim().split_once('=')?;
            if name.is_empty() {
                return None;
            }
            Some(CookieDescriptor {
                name: name.to_string(),
                value: value.to_string(),
                domain: domain.to_string(),
                path: "/".to_string(),
            })
        })
        .collect()
}

/// Inject cookies into a live CDP page **before** navigation.
///
/// Descriptors are converted into chromiumoxide [`CookieParam`]s via their JSON
/// shape; any that fail to convert are skipped. Having nothing to inject is not
/// an error, but a rejected `Network.setCookies` call is.
///
/// [`CookieParam`]: chromiumoxide::cdp::browser_protocol::network::CookieParam
pub async fn inject_into_page(
    page: &chromiumoxide::Page,
    credentials: &Credentials,
) -> anyhow::Result<usize> {
    use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetCookiesParams};

    let cookie_params: Vec<CookieParam> = credentials
        .cookies()
        .iter()
        .filter_map(|c| serde_json::to_value(c).ok())
        .filter_map(|v| serde_json::from_value::<CookieParam>(v).ok())
        .collect();

    if cookie_params.is_empty() {
        warn!("cookies: no valid CookieParams, skipping injection");
        return Ok(0);
    }

    let count = cookie_params.len();
    page.execute(SetCookiesParams::new(cookie_params))
        .await
        .map_err(|e| anyhow::anyhow!("failed to inject session cookies: {}", e))?;
    info!("cookies: injected {} session cookies into CDP page", count);
    Ok(count)
}
