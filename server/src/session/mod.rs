pub mod cookies;
pub mod credentials;
pub mod manager;
pub mod tokens;

pub use cookies::{CookieJar, CookieOptions, SameSite};
pub use credentials::{authenticate, register_account};
pub use manager::{REFRESH_COOKIE, REFRESH_COOKIE_PATH, SessionManager, SessionSettings, TokenPair};
pub use tokens::TokenKeys;
