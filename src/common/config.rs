use std::time::Duration;

use serde::Deserialize;

/// Consecutive redirect responses tolerated for one operation; the redirect
/// that reaches this count fails the operation.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Tunables for [`Transport`](crate::common::http::Transport).
///
/// Every timeout is finite; a configured value of `0` is raised to one second
/// so that no request can block indefinitely.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Time allowed for TCP connect (and TLS handshake).
    pub connect_timeout_secs: u64,
    /// Time allowed for sending the request and receiving the response head.
    pub write_timeout_secs: u64,
    /// Time allowed for reading the response body.
    pub read_timeout_secs: u64,
    pub max_redirects: usize,
    /// Advertise `Accept-Encoding: gzip` and decompress transparently.
    pub accept_gzip: bool,
    pub user_agent: String,
    pub pool_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            write_timeout_secs: 30,
            read_timeout_secs: 120,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            accept_gzip: true,
            user_agent: default_user_agent(),
            pool_idle_per_host: 16,
        }
    }
}

fn default_user_agent() -> String {
    concat!("davsync/", env!("CARGO_PKG_VERSION")).to_string()
}

fn finite(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        finite(self.connect_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        finite(self.write_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        finite(self.read_timeout_secs)
    }
}
