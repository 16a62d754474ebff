//! Normalized absolute resource URLs.

use hyper::Uri;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::fmt;
use std::str::FromStr;

use crate::error::{DavError, Result};

/// Bytes that cannot appear literally in a URI. `%` is deliberately absent so
/// existing escapes survive.
const NOT_URI_SAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// An absolute, normalized `http`/`https` URL.
///
/// Normalization lower-cases the scheme and host, removes `.`/`..` path
/// segments, turns an empty path into `/` and percent-encodes characters that
/// are not valid in a URI. It is idempotent. Collections are identified by a
/// trailing `/` (see [`ResourceLocation::as_collection`]).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceLocation(String);

impl ResourceLocation {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let without_fragment = input.split_once('#').map_or(input, |(head, _)| head);
        let encoded = utf8_percent_encode(without_fragment, NOT_URI_SAFE).to_string();

        let uri = Uri::from_str(&encoded).map_err(|e| DavError::InvalidUrl(format!("{input}: {e}")))?;
        let scheme = uri
            .scheme_str()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| DavError::InvalidUrl(format!("{input}: not an absolute URL")))?;
        if scheme != "http" && scheme != "https" {
            return Err(DavError::InvalidUrl(format!("{input}: unsupported scheme {scheme}")));
        }
        let authority = uri
            .authority()
            .map(|a| lowercase_host(a.as_str()))
            .filter(|a| !a.is_empty())
            .ok_or_else(|| DavError::InvalidUrl(format!("{input}: missing host")))?;

        let path = remove_dot_segments(uri.path());
        let path = if path.is_empty() { "/".to_string() } else { path };

        let mut out = format!("{scheme}://{authority}{path}");
        if let Some(query) = uri.query() {
            out.push('?');
            out.push_str(query);
        }
        Ok(Self(out))
    }

    /// Build `scheme://host[:port]/path`, leaving out the port when it is the
    /// scheme default.
    pub fn from_parts(scheme: &str, host: &str, port: u16, path: &str) -> Result<Self> {
        let default_port = match scheme {
            "https" => 443,
            _ => 80,
        };
        let host = host.trim_end_matches('.');
        let path = if path.starts_with('/') { path.to_string() } else { format!("/{path}") };
        if port == default_port {
            Self::parse(&format!("{scheme}://{host}{path}"))
        } else {
            Self::parse(&format!("{scheme}://{host}:{port}{path}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> &str {
        self.0.split_once("://").map_or("", |(scheme, _)| scheme)
    }

    /// `host[:port]`, lower case.
    pub fn authority(&self) -> &str {
        let rest = &self.0[self.scheme().len() + 3..];
        rest.find('/').map_or(rest, |end| &rest[..end])
    }

    /// Host name without port or user info.
    pub fn host(&self) -> &str {
        let authority = self.authority();
        let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
        if host_port.starts_with('[') {
            return host_port.find(']').map_or(host_port, |end| &host_port[..=end]);
        }
        host_port.split_once(':').map_or(host_port, |(host, _)| host)
    }

    /// Scheme, `://` and authority.
    pub fn origin(&self) -> &str {
        &self.0[..self.scheme().len() + 3 + self.authority().len()]
    }

    /// Path plus query.
    pub fn path_and_query(&self) -> &str {
        &self.0[self.origin().len()..]
    }

    pub fn path(&self) -> &str {
        let pq = self.path_and_query();
        pq.split_once('?').map_or(pq, |(path, _)| path)
    }

    pub fn is_https(&self) -> bool {
        self.scheme() == "https"
    }

    pub fn is_collection(&self) -> bool {
        self.path().ends_with('/')
    }

    /// The same location with a trailing `/` on its path.
    pub fn as_collection(&self) -> Self {
        if self.is_collection() {
            return self.clone();
        }
        let pq = self.path_and_query();
        let rebuilt = match pq.split_once('?') {
            Some((path, query)) => format!("{}{path}/?{query}", self.origin()),
            None => format!("{}/", self.0),
        };
        Self(rebuilt)
    }

    /// Equality that ignores a trailing `/` on the path.
    pub fn is_same_resource(&self, other: &Self) -> bool {
        self.origin() == other.origin()
            && self.path().trim_end_matches('/') == other.path().trim_end_matches('/')
            && self.query() == other.query()
    }

    fn query(&self) -> Option<&str> {
        self.path_and_query().split_once('?').map(|(_, q)| q)
    }

    /// Resolve a reference (absolute URL, network-path, absolute path or
    /// relative path) against this location as described in RFC 3986 §5.
    pub fn resolve(&self, reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(self.clone());
        }
        if has_scheme(reference) {
            return Self::parse(reference);
        }
        if let Some(rest) = reference.strip_prefix("//") {
            return Self::parse(&format!("{}://{rest}", self.scheme()));
        }
        if reference.starts_with('/') {
            return Self::parse(&format!("{}{reference}", self.origin()));
        }
        if reference.starts_with('?') {
            return Self::parse(&format!("{}{}{reference}", self.origin(), self.path()));
        }

        let path = self.path();
        let dir = path.rfind('/').map_or("/", |idx| &path[..=idx]);
        Self::parse(&format!("{}{dir}{reference}", self.origin()))
    }

    pub fn to_uri(&self) -> Result<Uri> {
        Uri::from_str(&self.0).map_err(|e| DavError::InvalidUrl(format!("{}: {e}", self.0)))
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceLocation({})", self.0)
    }
}

impl FromStr for ResourceLocation {
    type Err = DavError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ResourceLocation {
    type Error = DavError;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn has_scheme(reference: &str) -> bool {
    match reference.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Lower-case the host part of an authority, leaving user info untouched.
fn lowercase_host(authority: &str) -> String {
    match authority.rsplit_once('@') {
        Some((userinfo, host)) => format!("{userinfo}@{}", host.to_ascii_lowercase()),
        None => authority.to_ascii_lowercase(),
    }
}

/// RFC 3986 §5.2.4.
fn remove_dot_segments(path: &str) -> String {
    let mut output: Vec<&str> = Vec::new();
    let mut input = path;

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            output.pop();
        } else if input == "/.." {
            input = "/";
            output.pop();
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..].find('/').map_or(input.len(), |i| i + start);
            output.push(&input[..end]);
            input = &input[end..];
        }
    }
    output.concat()
}
