//! HTTP transport shared by every DAV operation.
//!
//! A [`Transport`] owns one pooled hyper client and applies the same policy to
//! every request: TLS through [`tls::client_config`], Basic authentication
//! (preemptive or after a challenge), the caller's [`CookieJar`], gzip
//! response decoding, finite timeouts and the redirect allow-list.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{HeaderMap, Method, Request, StatusCode};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use rustls::pki_types::CertificateDer;
use std::sync::Arc;
use tokio::time::timeout;

use crate::common::auth::{Credentials, offers_basic};
use crate::common::compression::{
    add_accept_encoding, decompress_body, detect_encodings, strip_encoding_headers,
};
use crate::common::config::TransportConfig;
use crate::common::cookies::CookieJar;
use crate::common::tls::{self, CertificateTrust, RejectUntrusted};
use crate::error::{DavError, Result};
use crate::webdav::location::ResourceLocation;

/// Type alias for the Hyper client used by the transport.
pub type HyperClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Methods whose redirects are followed by the transport itself. Everything
/// else (notably PROPFIND and REPORT) gets the 3xx response handed back.
const AUTO_REDIRECT_METHODS: [Method; 5] = [
    Method::OPTIONS,
    Method::GET,
    Method::HEAD,
    Method::PUT,
    Method::DELETE,
];

/// A fully read response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Where the response actually came from, after any followed redirects.
    pub location: ResourceLocation,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// The resolved `Location` of a 3xx response.
    pub fn redirect_target(&self) -> Option<Result<ResourceLocation>> {
        if !self.status.is_redirection() {
            return None;
        }
        let target = self.headers.get(header::LOCATION)?;
        Some(
            target
                .to_str()
                .map_err(|_| DavError::protocol("non-ASCII Location header"))
                .and_then(|target| self.location.resolve(target)),
        )
    }
}

/// Build a Hyper client over the given TLS configuration.
pub fn build_hyper_client(
    config: &TransportConfig,
    tls: rustls::ClientConfig,
) -> Result<HyperClient> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);
    http.set_connect_timeout(Some(config.connect_timeout()));

    let https = HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http);

    Ok(Client::builder(TokioExecutor::new())
        .http2_adaptive_window(true)
        .pool_max_idle_per_host(config.pool_idle_per_host)
        .build::<_, Full<Bytes>>(https))
}

/// Assembles a [`Transport`].
pub struct TransportBuilder {
    config: TransportConfig,
    credentials: Option<Credentials>,
    cookie_jar: Option<Arc<CookieJar>>,
    trust: Arc<dyn CertificateTrust>,
    extra_roots: Vec<CertificateDer<'static>>,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self {
            config: TransportConfig::default(),
            credentials: None,
            cookie_jar: None,
            trust: Arc::new(RejectUntrusted),
            extra_roots: Vec::new(),
        }
    }
}

impl TransportBuilder {
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Share a cookie store with other transports. Without one, the
    /// transport gets a private jar.
    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn certificate_trust(mut self, trust: Arc<dyn CertificateTrust>) -> Self {
        self.trust = trust;
        self
    }

    /// Additional trust anchors next to the bundled WebPKI roots.
    pub fn extra_root(mut self, der: CertificateDer<'static>) -> Self {
        self.extra_roots.push(der);
        self
    }

    pub fn build(self) -> Result<Transport> {
        let tls = tls::client_config(self.trust, &self.extra_roots)?;
        let client = build_hyper_client(&self.config, tls)?;
        Ok(Transport {
            client,
            config: Arc::new(self.config),
            credentials: self.credentials.map(Arc::new),
            cookies: self.cookie_jar.unwrap_or_default(),
        })
    }
}

/// Cheap to clone; clones share the connection pool and cookie jar.
#[derive(Clone)]
pub struct Transport {
    client: HyperClient,
    config: Arc<TransportConfig>,
    credentials: Option<Arc<Credentials>>,
    cookies: Arc<CookieJar>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn builder() -> TransportBuilder {
        TransportBuilder::default()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.cookies
    }

    /// Send a request, following redirects only for the auto-redirect
    /// methods. PROPFIND/REPORT 3xx responses are returned as is.
    pub async fn send(
        &self,
        method: Method,
        location: &ResourceLocation,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<RawResponse> {
        self.send_within(method, location, location, headers, body).await
    }

    /// Like [`send`](Self::send) for a request that started at `requested`
    /// and was redirected to `location`. Credentials only go to the origin
    /// of `requested`.
    pub async fn send_within(
        &self,
        method: Method,
        requested: &ResourceLocation,
        location: &ResourceLocation,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<RawResponse> {
        let follow = AUTO_REDIRECT_METHODS.contains(&method);
        let mut current = location.clone();
        let mut hops = 0usize;

        loop {
            let response = self
                .send_authenticated(&method, requested, &current, &headers, &body)
                .await?;
            if !follow {
                return Ok(response);
            }
            let Some(target) = response.redirect_target() else {
                return Ok(response);
            };

            hops += 1;
            if hops >= self.config.max_redirects {
                tracing::warn!(%method, url = %location, hops, "redirect limit reached");
                return Err(DavError::TooManyRedirects(self.config.max_redirects));
            }
            let target = target?;
            tracing::debug!(%method, from = %current, to = %target, "following redirect");
            current = target;
        }
    }

    /// One logical request including the single permitted auth retry.
    async fn send_authenticated(
        &self,
        method: &Method,
        requested: &ResourceLocation,
        location: &ResourceLocation,
        headers: &HeaderMap,
        body: &Bytes,
    ) -> Result<RawResponse> {
        let mut headers = headers.clone();
        let same_origin = location.origin() == requested.origin();
        if !same_origin {
            headers.remove(header::AUTHORIZATION);
            tracing::debug!(from = %requested.origin(), to = %location.origin(), "withholding credentials from redirect target");
        }
        let credentials = self.credentials.as_deref().filter(|_| same_origin);

        if let Some(creds) = credentials
            && creds.preemptive
            && !headers.contains_key(header::AUTHORIZATION)
        {
            headers.insert(header::AUTHORIZATION, creds.basic_header()?);
        }

        let response = self.send_once(method, location, &headers, body).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(creds) = credentials else {
            return Ok(response);
        };
        // A request that already carried credentials is never retried.
        if headers.contains_key(header::AUTHORIZATION) {
            tracing::debug!(url = %location, "credentials rejected");
            return Ok(response);
        }
        if !offers_basic(&response.headers) {
            tracing::debug!(url = %location, "no Basic challenge offered");
            return Ok(response);
        }

        tracing::trace!(url = %location, "answering Basic challenge");
        headers.insert(header::AUTHORIZATION, creds.basic_header()?);
        self.send_once(method, location, &headers, body).await
    }

    async fn send_once(
        &self,
        method: &Method,
        location: &ResourceLocation,
        headers: &HeaderMap,
        body: &Bytes,
    ) -> Result<RawResponse> {
        let mut req = Request::builder()
            .method(method.clone())
            .uri(location.to_uri()?)
            .body(Full::new(body.clone()))?;

        let h = req.headers_mut();
        for (name, value) in headers {
            h.append(name, value.clone());
        }
        if !h.contains_key(header::USER_AGENT)
            && let Ok(ua) = HeaderValue::from_str(&self.config.user_agent)
        {
            h.insert(header::USER_AGENT, ua);
        }
        if self.config.accept_gzip {
            add_accept_encoding(h);
        }
        if let Some(cookie) = self.cookies.header_for(location) {
            h.insert(header::COOKIE, cookie);
        }

        tracing::trace!(%method, url = %location, "sending request");
        let resp = timeout(self.config.write_timeout(), self.client.request(req))
            .await
            .map_err(|_| DavError::Timeout)??;

        let (parts, incoming) = resp.into_parts();
        self.cookies.store(location, &parts.headers);

        let encodings = detect_encodings(&parts.headers)
            .ok_or_else(|| DavError::protocol("unsupported Content-Encoding in response"))?;
        let body = timeout(
            self.config.read_timeout(),
            decompress_body(incoming, &encodings),
        )
        .await
        .map_err(|_| DavError::Timeout)??;

        let mut headers = parts.headers;
        if !encodings.is_empty() {
            strip_encoding_headers(&mut headers, body.len());
        }

        tracing::debug!(%method, url = %location, status = %parts.status, bytes = body.len(), "response");
        Ok(RawResponse {
            location: location.clone(),
            status: parts.status,
            headers,
            body,
        })
    }
}
