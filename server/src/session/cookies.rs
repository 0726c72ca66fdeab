use std::time::Duration;

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Option<Duration>,
    pub path: Option<String>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

/// The only view of cookies the session manager gets.
///
/// The transport supplies an implementation per request; reads see the
/// incoming `Cookie` header, writes become outgoing `Set-Cookie` headers.
pub trait CookieJar {
    fn read_cookie(&self, name: &str) -> Option<String>;

    fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions);

    /// Expire a cookie. `options` must carry the path it was set with.
    fn clear_cookie(&mut self, name: &str, options: &CookieOptions);
}
