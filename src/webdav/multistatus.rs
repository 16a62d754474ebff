//! Decoding of `207 Multi-Status` bodies.
//!
//! Per-property failures are tolerated: a `<propstat>` whose status is not
//! 1xx/2xx only makes its properties absent. The decode as a whole fails only
//! when the response is not a multistatus document at all.

use hyper::StatusCode;

use crate::common::http::RawResponse;
use crate::error::{DavError, Result};
use crate::webdav::location::ResourceLocation;
use crate::webdav::names::{self, PropertyName};
use crate::webdav::property::{PropertyBag, decode_property};
use crate::webdav::xml::{XmlElement, parse_document};

const MULTISTATUS: PropertyName = PropertyName::from_static(names::DAV, "multistatus");
const RESPONSE: PropertyName = PropertyName::from_static(names::DAV, "response");
const HREF: PropertyName = PropertyName::from_static(names::DAV, "href");
const STATUS: PropertyName = PropertyName::from_static(names::DAV, "status");
const PROPSTAT: PropertyName = PropertyName::from_static(names::DAV, "propstat");
const PROP: PropertyName = PropertyName::from_static(names::DAV, "prop");

/// One `(properties, status)` pair of a `<response>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Propstat {
    pub properties: PropertyBag,
    /// `None` when the status line could not be parsed.
    pub status: Option<StatusCode>,
}

impl Propstat {
    pub fn is_success(&self) -> bool {
        self.status
            .is_some_and(|s| s.is_informational() || s.is_success())
    }
}

/// One `<response>` element, href still unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResponse {
    pub href: String,
    /// Response-level `<status>`, used by servers for missing members.
    pub status: Option<StatusCode>,
    pub propstats: Vec<Propstat>,
}

impl DavResponse {
    /// Properties of every successful propstat.
    pub fn properties(&self) -> PropertyBag {
        let mut bag = PropertyBag::new();
        for propstat in self.propstats.iter().filter(|p| p.is_success()) {
            bag.merge(propstat.properties.clone());
        }
        bag
    }
}

/// All `<response>` elements of a multistatus body, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultistatusResponse {
    pub responses: Vec<DavResponse>,
}

/// A resource with its successfully fetched properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResource {
    pub location: ResourceLocation,
    pub status: Option<StatusCode>,
    pub properties: PropertyBag,
}

/// A multistatus folded against the location it was requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropfindResult {
    /// The location the multistatus answered, after redirects.
    pub location: ResourceLocation,
    /// Properties of the requested resource itself, if it was listed.
    pub own: Option<PropertyBag>,
    pub members: Vec<DavResource>,
}

impl PropfindResult {
    /// Properties of the requested resource for a depth 0 request. Servers
    /// that rewrite the path internally answer with a different href; a
    /// single listed resource is taken as the requested one.
    pub fn into_single(self) -> Option<DavResource> {
        match self.own {
            Some(properties) => Some(DavResource {
                location: self.location,
                status: None,
                properties,
            }),
            None if self.members.len() == 1 => self.members.into_iter().next(),
            None => None,
        }
    }
}

impl MultistatusResponse {
    /// Check the status and decode the body of a response expected to be `207`.
    pub fn from_response(response: &RawResponse) -> Result<Self> {
        if response.status.is_client_error() || response.status.is_server_error() {
            return Err(DavError::from_status(response.status));
        }
        if response.status != StatusCode::MULTI_STATUS {
            return Err(DavError::protocol(format!(
                "expected 207 Multi-Status, got {}",
                response.status
            )));
        }
        if response.body.is_empty() {
            return Err(DavError::protocol("207 response without body"));
        }
        Self::parse(&response.body)
    }

    /// Decode a multistatus document.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let root = parse_document(body)?;
        if !root.is(&MULTISTATUS) {
            return Err(DavError::protocol(format!(
                "expected DAV:multistatus, got {{{}}}{}",
                root.namespace, root.name
            )));
        }

        let mut responses = Vec::new();
        for response in root.children_named(&RESPONSE) {
            let status = response
                .child(&STATUS)
                .and_then(XmlElement::trimmed_text)
                .and_then(parse_status_line);
            let propstats: Vec<Propstat> = response
                .children_named(&PROPSTAT)
                .map(decode_propstat)
                .collect();

            for href in response.children_named(&HREF).filter_map(XmlElement::trimmed_text) {
                responses.push(DavResponse {
                    href: href.to_string(),
                    status,
                    propstats: propstats.clone(),
                });
            }
        }
        Ok(Self { responses })
    }

    /// Resolve every href against `request` and separate the requested
    /// resource from its members. Collections are keyed with a trailing `/`.
    pub fn fold(self, request: &ResourceLocation) -> PropfindResult {
        let mut result = PropfindResult {
            location: request.clone(),
            own: None,
            members: Vec::new(),
        };

        for response in self.responses {
            let mut location = match request.resolve(&response.href) {
                Ok(location) => location,
                Err(err) => {
                    tracing::debug!(href = %response.href, error = %err, "skipping unresolvable href");
                    continue;
                }
            };
            let properties = response.properties();
            if properties.resource_type().collection {
                location = location.as_collection();
            }

            if location.is_same_resource(request) {
                result.own.get_or_insert_with(PropertyBag::new).merge(properties);
            } else if let Some(existing) = result.members.iter_mut().find(|m| m.location == location) {
                existing.properties.merge(properties);
            } else {
                result.members.push(DavResource {
                    location,
                    status: response.status,
                    properties,
                });
            }
        }
        result
    }
}

fn decode_propstat(propstat: &XmlElement) -> Propstat {
    // Lenient servers omit the status; treat that as success.
    let status = match propstat.child(&STATUS).and_then(XmlElement::trimmed_text) {
        Some(line) => parse_status_line(line),
        None => Some(StatusCode::OK),
    };
    let properties = propstat
        .children_named(&PROP)
        .flat_map(|prop| prop.children.iter())
        .filter_map(decode_property)
        .collect();
    Propstat { properties, status }
}

/// `HTTP/1.1 404 Not Found` → `404`.
pub fn parse_status_line(line: &str) -> Option<StatusCode> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
}
