use std::time::Duration;

use hyper::Response;
use hyper::header::{HeaderMap, HeaderValue, SET_COOKIE};
use tracing::warn;

use crate::handlers::http::utils::headers::{get_cookie, set_cookie};
use crate::session::{CookieJar, CookieOptions};

/// [`CookieJar`] over one HTTP exchange.
///
/// Reads come from the request's `Cookie` headers; writes are queued and
/// attached to the response with [`HttpCookieJar::apply`].
#[derive(Debug, Default)]
pub struct HttpCookieJar {
    incoming: HeaderMap,
    outgoing: Vec<HeaderValue>,
}

impl HttpCookieJar {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = HeaderMap::new();
        for value in headers.get_all(hyper::header::COOKIE) {
            incoming.append(hyper::header::COOKIE, value.clone());
        }
        Self {
            incoming,
            outgoing: Vec::new(),
        }
    }

    /// Pending `Set-Cookie` values, in the order they were written.
    pub fn pending(&self) -> &[HeaderValue] {
        &self.outgoing
    }

    pub fn apply<B>(self, response: &mut Response<B>) {
        let headers = response.headers_mut();
        for value in self.outgoing {
            headers.append(SET_COOKIE, value);
        }
    }

    fn push(&mut self, name: &str, value: &str, max_age: Option<Duration>, options: &CookieOptions) {
        match set_cookie(
            name,
            value,
            max_age,
            options.path.as_deref(),
            options.http_only,
            options.secure,
            options.same_site,
        ) {
            Ok(header) => self.outgoing.push(header),
            Err(e) => warn!("Dropping cookie {}: {}", name, e),
        }
    }
}

impl CookieJar for HttpCookieJar {
    fn read_cookie(&self, name: &str) -> Option<String> {
        get_cookie(&self.incoming, name)
    }

    fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) {
        self.push(name, value, options.max_age, options);
    }

    fn clear_cookie(&mut self, name: &str, options: &CookieOptions) {
        self.push(name, "", Some(Duration::ZERO), options);
    }
}
