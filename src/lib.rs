pub mod collect;
pub mod core;
pub mod extractor;
pub mod scraping;

// --- Primary core exports ---
pub use crate::core::config;
pub use crate::core::types;
pub use crate::core::types::*;
pub use crate::core::{CollectError, SessionError};

pub use collect::{run_search, search_url, search_with_cookies, Accumulator, ScrollCollector};
pub use extractor::{extract, extract_at, Snapshot};
pub use scraping::{ChromeBackend, Credentials, RenderBackend, RenderSession};
