pub mod browser_manager;
pub mod cookies;
pub mod session;

pub use cookies::{CookieDescriptor, Credentials};
pub use session::{ChromeBackend, ChromeSession, RenderBackend, RenderSession};
