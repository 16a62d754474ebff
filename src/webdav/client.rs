use bytes::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::{HeaderMap, Method};

use crate::common::auth::Credentials;
use crate::common::config::TransportConfig;
use crate::common::http::{RawResponse, Transport};
use crate::error::{DavError, Result, check_status};
use crate::webdav::location::ResourceLocation;
use crate::webdav::multistatus::{DavResource, MultistatusResponse, PropfindResult};
use crate::webdav::names::PropertyName;
use crate::webdav::types::{
    DavCapabilities, Depth, PropfindPurpose, PutMode, ServiceType, etag_from_headers,
};
use crate::webdav::xml::{build_multiget_body, build_propfind_body};

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// WebDAV resource operations on top of a [`Transport`].
///
/// Every method takes absolute [`ResourceLocation`]s; there is no implicit
/// base URL. Cloning is cheap and reuses the same connection pool.
#[derive(Clone, Debug)]
pub struct WebDavClient {
    transport: Transport,
}

impl WebDavClient {
    /// Client with its own connection pool and cookie jar, trusting only the
    /// bundled WebPKI roots.
    pub fn new(config: TransportConfig, credentials: Option<Credentials>) -> Result<Self> {
        let transport = Transport::builder()
            .config(config)
            .credentials(credentials)
            .build()?;
        Ok(Self { transport })
    }

    pub fn with_transport(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// `OPTIONS`: read the `Allow` and `DAV` headers.
    pub async fn options(&self, location: &ResourceLocation) -> Result<DavCapabilities> {
        let resp = self
            .transport
            .send(Method::OPTIONS, location, HeaderMap::new(), Bytes::new())
            .await?;
        check_status(resp.status)?;
        Ok(DavCapabilities::from_headers(&resp.headers))
    }

    /// Whether the resource at `location` advertises `service` in its `DAV` header.
    pub async fn supports(&self, location: &ResourceLocation, service: ServiceType) -> Result<bool> {
        Ok(self.options(location).await?.offers(service))
    }

    /// `PROPFIND` for the properties selected by `purpose`, folded against
    /// the final location after any redirects.
    pub async fn propfind(
        &self,
        location: &ResourceLocation,
        purpose: PropfindPurpose,
    ) -> Result<PropfindResult> {
        self.propfind_props(location, purpose.depth(), &purpose.properties())
            .await
    }

    /// `PROPFIND` for an explicit property list.
    pub async fn propfind_props(
        &self,
        location: &ResourceLocation,
        depth: Depth,
        props: &[PropertyName],
    ) -> Result<PropfindResult> {
        let body = Bytes::from(build_propfind_body(props));
        let resp = self
            .send_reissuing(propfind_method()?, location, depth, body)
            .await?;
        let multistatus = MultistatusResponse::from_response(&resp)?;
        Ok(multistatus.fold(&resp.location))
    }

    /// `REPORT` multiget of `members` of `collection`: the ETag and the
    /// service's data property for each.
    pub async fn multiget(
        &self,
        collection: &ResourceLocation,
        service: ServiceType,
        members: &[ResourceLocation],
    ) -> Result<Vec<DavResource>> {
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let hrefs: Vec<&str> = members.iter().map(ResourceLocation::path_and_query).collect();
        let body = Bytes::from(build_multiget_body(service, &hrefs));
        let resp = self
            .send_reissuing(report_method()?, collection, Depth::Zero, body)
            .await?;
        let multistatus = MultistatusResponse::from_response(&resp)?;
        let folded = multistatus.fold(&resp.location);
        Ok(folded.members)
    }

    /// Conditional `PUT`. Returns the new ETag if the server sent one.
    pub async fn put(
        &self,
        location: &ResourceLocation,
        body: Bytes,
        content_type: &str,
        mode: &PutMode,
    ) -> Result<Option<String>> {
        let mut h = HeaderMap::new();
        h.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type).map_err(|e| DavError::InvalidRequest(e.into()))?,
        );
        match mode {
            PutMode::Create => {
                h.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
            }
            PutMode::Update(etag) => {
                let value = etag.as_deref().unwrap_or("*");
                h.insert(
                    header::IF_MATCH,
                    HeaderValue::from_str(value).map_err(|e| DavError::InvalidRequest(e.into()))?,
                );
            }
        }
        let resp = self.transport.send(Method::PUT, location, h, body).await?;
        check_status(resp.status)?;
        Ok(etag_from_headers(&resp.headers))
    }

    /// `DELETE`, conditional on `etag` when one is known.
    pub async fn delete(&self, location: &ResourceLocation, etag: Option<&str>) -> Result<()> {
        let mut h = HeaderMap::new();
        if let Some(etag) = etag {
            h.insert(
                header::IF_MATCH,
                HeaderValue::from_str(etag).map_err(|e| DavError::InvalidRequest(e.into()))?,
            );
        }
        let resp = self
            .transport
            .send(Method::DELETE, location, h, Bytes::new())
            .await?;
        check_status(resp.status)
    }

    /// Current CTag of a collection, if the server supports it.
    pub async fn get_ctag(&self, collection: &ResourceLocation) -> Result<Option<String>> {
        let result = self.propfind(collection, PropfindPurpose::CTag).await?;
        Ok(result.own.and_then(|bag| bag.ctag().map(str::to_string)))
    }

    /// ETags of all non-collection members of a collection.
    pub async fn list_member_etags(
        &self,
        collection: &ResourceLocation,
    ) -> Result<Vec<(ResourceLocation, String)>> {
        let result = self
            .propfind(collection, PropfindPurpose::MemberETags)
            .await?;
        Ok(result
            .members
            .into_iter()
            .filter(|m| !m.properties.resource_type().collection)
            .filter_map(|m| {
                let etag = m.properties.etag()?.to_string();
                Some((m.location, etag))
            })
            .collect())
    }

    /// Send a PROPFIND/REPORT and reissue it, same method, depth and body, at
    /// each redirect target until a non-redirect arrives.
    async fn send_reissuing(
        &self,
        method: Method,
        location: &ResourceLocation,
        depth: Depth,
        body: Bytes,
    ) -> Result<RawResponse> {
        let max = self.transport.config().max_redirects;
        let mut current = location.clone();
        let mut hops = 0usize;

        loop {
            let mut h = HeaderMap::new();
            h.insert("depth", HeaderValue::from_static(depth.as_str()));
            h.insert(header::CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));

            let resp = self
                .transport
                .send_within(method.clone(), location, &current, h, body.clone())
                .await?;
            let Some(target) = resp.redirect_target() else {
                return Ok(resp);
            };

            hops += 1;
            if hops >= max {
                tracing::warn!(%method, url = %location, hops, "redirect limit reached");
                return Err(DavError::TooManyRedirects(max));
            }
            let target = target?;
            tracing::debug!(%method, from = %current, to = %target, status = %resp.status, "reissuing after redirect");
            current = target;
        }
    }
}

fn propfind_method() -> Result<Method> {
    Method::from_bytes(b"PROPFIND").map_err(|e| DavError::InvalidRequest(e.into()))
}

fn report_method() -> Result<Method> {
    Method::from_bytes(b"REPORT").map_err(|e| DavError::InvalidRequest(e.into()))
}
