//! Error taxonomy shared by the transport, resource operations and discovery.

use hyper::StatusCode;

/// Convenience alias used throughout the crate.
pub type Result<T, E = DavError> = std::result::Result<T, E>;

/// Errors produced by DAV operations.
///
/// Per-property failures inside a multistatus body are *not* errors; they only
/// make the property absent. Everything else that prevents an operation from
/// producing its result ends up here.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum DavError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("could not build request: {0}")]
    InvalidRequest(#[from] hyper::http::Error),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("error reading response body: {0}")]
    Body(#[from] hyper::Error),

    #[error("request timed out")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// `401 Unauthorized`, after any permitted authentication retry.
    #[error("not authorized")]
    NotAuthorized,

    /// `404 Not Found`.
    #[error("resource not found")]
    NotFound,

    /// `412 Precondition Failed` (ETag mismatch or resource already exists).
    #[error("precondition failed")]
    PreconditionFailed,

    /// Any other non-success status.
    #[error("HTTP {status}: {reason}")]
    Http { status: StatusCode, reason: String },

    /// The server answered, but not with a usable multistatus document.
    #[error("DAV protocol error: {0}")]
    Protocol(String),

    #[error("too many redirects (limit is {0})")]
    TooManyRedirects(usize),

    #[error("DNS lookup failed: {0}")]
    Dns(String),

    /// Discovery exhausted every fallback for every service type.
    #[error("no CalDAV or CardDAV service detected")]
    NothingDetected,

    /// A background refresh ended without producing an outcome.
    #[error("refresh task aborted: {0}")]
    RefreshAborted(String),
}

impl DavError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Map a non-success status to its typed outcome.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::NotAuthorized,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::PRECONDITION_FAILED => Self::PreconditionFailed,
            other => Self::Http {
                status: other,
                reason: other.canonical_reason().unwrap_or("").to_string(),
            },
        }
    }

    /// True for failures below HTTP: DNS, connect, reset, TLS, timeout.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Body(_) | Self::Timeout | Self::Io(_) | Self::Dns(_)
        )
    }
}

impl From<quick_xml::Error> for DavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Protocol(format!("malformed XML: {e}"))
    }
}

/// Fail with the typed status error unless `status` is 2xx.
pub fn check_status(status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(DavError::from_status(status))
    }
}
