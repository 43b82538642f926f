//! Cookie persistence across calls.
//!
//! # Design
//! `CookieStore` is a cheap, cloneable handle around a `cookie_store` jar:
//! every clone points at the same mutex-guarded jar, so a store taken from
//! one `Response` and passed into the next request sees everything the first
//! exchange recorded. Domain and path matching, host-only cookies, `Secure`
//! and `Max-Age`/`Expires` are the jar's business. On top of it, a `Domain`
//! attribute with no embedded dot is refused unless it names the host itself,
//! so a server cannot set a cookie for a whole top-level domain.

use std::cmp::Reverse;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cookie::Cookie;
use url::Url;

use crate::error::{Error, Result};

type Jar = cookie_store::CookieStore;

/// Shared accumulator of cookie state.
///
/// Internally synchronized: clones may be used from several threads, but
/// concurrent requests sharing one store race on which `Set-Cookie` lands last.
#[derive(Clone, Default)]
pub struct CookieStore {
    inner: Arc<Mutex<Jar>>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a `Set-Cookie` line as if `url` had sent it.
    pub fn insert(&self, url: &str, set_cookie: &str) -> Result<()> {
        let url = Url::parse(url).map_err(|e| Error::invalid(format!("invalid URL {url:?}: {e}")))?;
        self.store_response_cookies(&url, [set_cookie]);
        Ok(())
    }

    /// Merge the `Set-Cookie` lines of a response received from `url`.
    ///
    /// Unusable lines are skipped. An already-expired cookie deletes its
    /// stored counterpart.
    pub fn store_response_cookies<'a>(&self, url: &Url, lines: impl IntoIterator<Item = &'a str>) {
        let mut jar = self.lock();
        for line in lines {
            let Some(cookie) = parse_set_cookie(url, line) else {
                tracing::debug!(url = %url, line, "ignoring unusable Set-Cookie");
                continue;
            };
            match jar.insert_raw(&cookie, url) {
                Ok(_) => tracing::debug!(name = cookie.name(), url = %url, "cookie stored"),
                Err(e) => tracing::debug!(name = cookie.name(), url = %url, error = %e, "cookie not stored"),
            }
        }
    }

    /// Value for a `Cookie` request header targeting `url`, if any cookie applies.
    ///
    /// Cookies with longer paths come first.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let jar = self.lock();
        let mut cookies = jar.matches(url);
        if cookies.is_empty() {
            return None;
        }
        cookies.sort_by_key(|c| Reverse(c.path().map_or(0, str::len)));
        Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name(), c.value()))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Value of the first live cookie named `name`, regardless of domain.
    pub fn get(&self, name: &str) -> Option<String> {
        self.lock()
            .iter_unexpired()
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().iter_unexpired().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        *self.lock() = Jar::default();
    }

    /// True when both handles refer to the same underlying store.
    pub fn same_store(&self, other: &CookieStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, Jar> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieStore").field("cookies", &self.len()).finish()
    }
}

fn parse_set_cookie(url: &Url, line: &str) -> Option<Cookie<'static>> {
    let cookie = Cookie::parse(line.to_string()).ok()?;
    if cookie.name().is_empty() {
        return None;
    }
    if let Some(domain) = cookie.domain() {
        let domain = domain.trim_start_matches('.');
        let host = url.host_str()?;
        if !domain.is_empty() && !domain.contains('.') && !domain.eq_ignore_ascii_case(host) {
            return None;
        }
    }
    Some(cookie)
}
