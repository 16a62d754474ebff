//! Minimal in-memory cookie storage.
//!
//! Cookies are keyed by the **exact request URL** they were received on and are
//! only sent back to that same URL. There is no domain/path scoping as described
//! in RFC 6265, so a session cookie set on `/dav/` is not sent to
//! `/dav/calendars/`. This is a known limitation: it is enough for servers that
//! hand out a session cookie per DAV endpoint, and nothing more.

use hyper::HeaderMap;
use hyper::header::{self, HeaderValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::webdav::location::ResourceLocation;

/// Thread-safe cookie store shared by every request of a [`Transport`].
///
/// Create one per application (or per account) and hand it to
/// [`TransportBuilder::cookie_jar`]; clones of the `Arc` may be shared by
/// concurrently running operations.
///
/// [`Transport`]: crate::common::http::Transport
/// [`TransportBuilder::cookie_jar`]: crate::common::http::TransportBuilder::cookie_jar
#[derive(Debug, Default)]
pub struct CookieJar {
    by_url: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the `Set-Cookie` headers of a response to `url`.
    pub fn store(&self, url: &ResourceLocation, headers: &HeaderMap) {
        let mut updates = Vec::new();
        for value in headers.get_all(header::SET_COOKIE) {
            if let Ok(raw) = value.to_str()
                && let Some(parsed) = parse_set_cookie(raw)
            {
                updates.push(parsed);
            }
        }
        if updates.is_empty() {
            return;
        }

        let Ok(mut guard) = self.by_url.write() else {
            return;
        };
        let jar = guard.entry(url.to_string()).or_default();
        for (name, value, expired) in updates {
            if expired {
                jar.remove(&name);
            } else {
                jar.insert(name, value);
            }
        }
        if jar.is_empty() {
            guard.remove(&url.to_string());
        }
    }

    /// Build the `Cookie` header for a request to `url`, if any cookie applies.
    pub fn header_for(&self, url: &ResourceLocation) -> Option<HeaderValue> {
        let guard = self.by_url.read().ok()?;
        let jar = guard.get(&url.to_string())?;
        let rendered = jar
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&rendered).ok()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.by_url.write() {
            guard.clear();
        }
    }
}

/// Returns `(name, value, expired)`.
fn parse_set_cookie(raw: &str) -> Option<(String, String, bool)> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let expired = parts.any(|attr| {
        attr.split_once('=').is_some_and(|(key, val)| {
            key.trim().eq_ignore_ascii_case("max-age")
                && val.trim().parse::<i64>().is_ok_and(|age| age <= 0)
        })
    });

    Some((name.to_string(), value.trim().to_string(), expired))
}
