//! Credentials and HTTP Basic authentication.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use hyper::HeaderMap;
use hyper::header::{self, HeaderValue};
use std::fmt;

use crate::error::{DavError, Result};

/// A secret that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<REDACTED>")
    }
}

impl<S> From<S> for Password
where
    String: From<S>,
{
    fn from(value: S) -> Self {
        Password(String::from(value))
    }
}

impl Password {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// User credentials, owned by the caller and handed to the transport.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Password,
    /// Send the `Authorization` header with every request instead of waiting
    /// for a `401` challenge.
    pub preemptive: bool,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<Password>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            preemptive: false,
        }
    }

    pub fn preemptive(mut self, preemptive: bool) -> Self {
        self.preemptive = preemptive;
        self
    }

    /// Render the `Authorization: Basic …` header. The value is marked
    /// sensitive so hyper never logs it.
    pub fn basic_header(&self) -> Result<HeaderValue> {
        let token = format!("{}:{}", self.username, self.password.as_str());
        let mut value = HeaderValue::from_str(&format!("Basic {}", B64.encode(token)))
            .map_err(|e| DavError::InvalidRequest(e.into()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Whether a `401` response offers a challenge we can answer.
///
/// Servers that omit `WWW-Authenticate` are given the benefit of the doubt.
pub(crate) fn offers_basic(headers: &HeaderMap) -> bool {
    let mut challenges = headers.get_all(header::WWW_AUTHENTICATE).iter().peekable();
    if challenges.peek().is_none() {
        return true;
    }
    challenges.any(|value| {
        value
            .to_str()
            .map(|s| {
                s.split(',')
                    .any(|part| part.trim_start().to_ascii_lowercase().starts_with("basic"))
            })
            .unwrap_or(false)
    })
}
