//! DNS-based service discovery (RFC 6764): SRV for the host, TXT for the
//! context path.

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use std::future::Future;

use crate::error::{DavError, Result};
use crate::webdav::types::ServiceType;

/// One SRV record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvTarget {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    /// Host name without the trailing dot.
    pub target: String,
}

/// Source of SRV and TXT records. An empty result means "no such records";
/// errors are reserved for failed lookups.
pub trait ServiceResolver: Send + Sync {
    fn lookup_srv(&self, name: &str) -> impl Future<Output = Result<Vec<SrvTarget>>> + Send;

    /// Each TXT record as one string (character strings concatenated).
    fn lookup_txt(&self, name: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Resolver backed by the system DNS configuration.
#[derive(Clone)]
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl std::fmt::Debug for SystemResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemResolver").finish_non_exhaustive()
    }
}

impl SystemResolver {
    pub fn from_system_conf() -> Result<Self> {
        let inner = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| DavError::Dns(format!("cannot read resolver configuration: {e}")))?;
        Ok(Self { inner })
    }
}

fn not_found_is_empty<T>(r: std::result::Result<Vec<T>, ResolveError>) -> Result<Vec<T>> {
    match r {
        Ok(v) => Ok(v),
        Err(e) => match e.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
            _ => Err(DavError::Dns(e.to_string())),
        },
    }
}

impl ServiceResolver for SystemResolver {
    async fn lookup_srv(&self, name: &str) -> Result<Vec<SrvTarget>> {
        let lookup = self.inner.srv_lookup(name).await.map(|r| {
            r.iter()
                .map(|srv| SrvTarget {
                    priority: srv.priority(),
                    weight: srv.weight(),
                    port: srv.port(),
                    target: srv.target().to_utf8().trim_end_matches('.').to_string(),
                })
                .collect::<Vec<_>>()
        });
        not_found_is_empty(lookup)
    }

    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>> {
        let lookup = self.inner.txt_lookup(name).await.map(|r| {
            r.iter()
                .map(|parts| {
                    let mut combined = Vec::new();
                    for part in parts.iter() {
                        combined.extend_from_slice(part);
                    }
                    String::from_utf8_lossy(&combined).into_owned()
                })
                .collect::<Vec<_>>()
        });
        not_found_is_empty(lookup)
    }
}

/// `_carddavs._tcp.example.com` / `_caldavs._tcp.example.com`.
pub fn service_query_name(service: ServiceType, domain: &str) -> String {
    format!("_{}._tcp.{}", service.srv_service(), domain.trim_end_matches('.'))
}

/// The record to use: lowest priority, then highest weight.
///
/// A target of `.` means the service is decidedly not available
/// (RFC 2782) and yields `None`.
pub fn select_srv(records: &[SrvTarget]) -> Option<&SrvTarget> {
    let best = records
        .iter()
        .min_by(|a, b| a.priority.cmp(&b.priority).then(b.weight.cmp(&a.weight)))?;
    if records.len() > 1 {
        tracing::debug!(count = records.len(), chosen = %best.target, "multiple SRV records, using the preferred one");
    }
    (!best.target.is_empty() && best.target != ".").then_some(best)
}

/// Context path from `path=/...` in a TXT record.
pub fn path_from_txt(records: &[String]) -> Option<String> {
    records
        .iter()
        .flat_map(|r| r.split_whitespace())
        .find_map(|kv| kv.strip_prefix("path="))
        .filter(|p| p.starts_with('/'))
        .map(str::to_string)
}
