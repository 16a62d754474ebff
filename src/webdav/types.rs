use hyper::HeaderMap;
use hyper::header;
use std::collections::BTreeSet;

use crate::webdav::names::{self, PropertyName};

/// WebDAV Depth
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
}

impl Depth {
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
        }
    }
}

/// The two DAV services this crate discovers and talks to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceType {
    CardDav,
    CalDav,
}

impl ServiceType {
    pub const ALL: [ServiceType; 2] = [ServiceType::CardDav, ServiceType::CalDav];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::CardDav => "carddav",
            ServiceType::CalDav => "caldav",
        }
    }

    /// `/.well-known/carddav` or `/.well-known/caldav` (RFC 6764).
    pub fn well_known_path(self) -> &'static str {
        match self {
            ServiceType::CardDav => "/.well-known/carddav",
            ServiceType::CalDav => "/.well-known/caldav",
        }
    }

    /// DNS-SD service label for TLS service discovery.
    pub fn srv_service(self) -> &'static str {
        match self {
            ServiceType::CardDav => "carddavs",
            ServiceType::CalDav => "caldavs",
        }
    }

    /// Token a server lists in its `DAV` header when it offers the service.
    pub fn capability(self) -> &'static str {
        match self {
            ServiceType::CardDav => "addressbook",
            ServiceType::CalDav => "calendar-access",
        }
    }

    pub fn home_set_property(self) -> PropertyName {
        match self {
            ServiceType::CardDav => names::ADDRESSBOOK_HOME_SET,
            ServiceType::CalDav => names::CALENDAR_HOME_SET,
        }
    }

    pub fn description_property(self) -> PropertyName {
        match self {
            ServiceType::CardDav => names::ADDRESSBOOK_DESCRIPTION,
            ServiceType::CalDav => names::CALENDAR_DESCRIPTION,
        }
    }

    pub fn data_property(self) -> PropertyName {
        match self {
            ServiceType::CardDav => names::ADDRESS_DATA,
            ServiceType::CalDav => names::CALENDAR_DATA,
        }
    }

    /// Content type of the resources stored in this service's collections.
    pub fn content_type(self) -> &'static str {
        match self {
            ServiceType::CardDav => "text/vcard; charset=utf-8",
            ServiceType::CalDav => "text/calendar; charset=utf-8",
        }
    }

    /// Collection properties shown to the user, beyond the common ones.
    fn collection_properties(self) -> &'static [PropertyName] {
        match self {
            ServiceType::CardDav => &[names::ADDRESSBOOK_DESCRIPTION, names::SUPPORTED_ADDRESS_DATA],
            ServiceType::CalDav => &[
                names::CALENDAR_DESCRIPTION,
                names::CALENDAR_COLOR,
                names::CALENDAR_TIMEZONE,
                names::SUPPORTED_CALENDAR_COMPONENT_SET,
            ],
        }
    }
}

/// Why a PROPFIND is sent; selects the requested properties and the depth.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PropfindPurpose {
    /// `current-user-principal` only.
    PrincipalLookup,
    /// Both home-set properties.
    HomeSetLookup,
    /// Depth 1 listing of the collections inside a home set.
    MemberEnumeration(ServiceType),
    /// `getctag` of a single collection.
    CTag,
    /// Depth 1 `getctag` + `getetag`, to diff a collection against a mirror.
    MemberETags,
    /// Depth 0 probe of a user-supplied URL during discovery.
    ResourceProbe(ServiceType),
    /// CalDAV scheduling addresses of a principal.
    EmailAddressSet,
}

impl PropfindPurpose {
    pub fn depth(self) -> Depth {
        match self {
            PropfindPurpose::MemberEnumeration(_) | PropfindPurpose::MemberETags => Depth::One,
            _ => Depth::Zero,
        }
    }

    pub fn properties(self) -> Vec<PropertyName> {
        match self {
            PropfindPurpose::PrincipalLookup => vec![names::CURRENT_USER_PRINCIPAL],
            PropfindPurpose::HomeSetLookup => {
                vec![names::ADDRESSBOOK_HOME_SET, names::CALENDAR_HOME_SET]
            }
            PropfindPurpose::MemberEnumeration(service) => {
                let mut props = vec![
                    names::DISPLAY_NAME,
                    names::RESOURCETYPE,
                    names::CURRENT_USER_PRIVILEGE_SET,
                ];
                props.extend_from_slice(service.collection_properties());
                props
            }
            PropfindPurpose::CTag => vec![names::GETCTAG],
            PropfindPurpose::MemberETags => vec![names::GETCTAG, names::GETETAG],
            PropfindPurpose::ResourceProbe(service) => {
                let mut props = vec![
                    names::RESOURCETYPE,
                    names::DISPLAY_NAME,
                    names::CURRENT_USER_PRINCIPAL,
                    names::CURRENT_USER_PRIVILEGE_SET,
                    service.home_set_property(),
                ];
                props.extend_from_slice(service.collection_properties());
                props
            }
            PropfindPurpose::EmailAddressSet => vec![names::CALENDAR_USER_ADDRESS_SET],
        }
    }
}

/// Conditional semantics of a PUT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutMode {
    /// Fail with `412` if the resource already exists (`If-None-Match: *`).
    Create,
    /// Fail with `412` if the resource changed since `etag` was seen
    /// (`If-Match`). `None` only requires that it exists.
    Update(Option<String>),
}

/// Result of an OPTIONS probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavCapabilities {
    /// Upper-case method names from `Allow`.
    pub methods: BTreeSet<String>,
    /// Tokens from `DAV`, e.g. `1`, `addressbook`, `calendar-access`.
    pub dav: BTreeSet<String>,
}

impl DavCapabilities {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let tokens = |name: header::HeaderName| -> BTreeSet<String> {
            headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        };
        let methods = tokens(header::ALLOW)
            .into_iter()
            .map(|m| m.to_ascii_uppercase())
            .collect();
        let dav = tokens(header::HeaderName::from_static("dav"));
        Self { methods, dav }
    }

    pub fn supports(&self, token: &str) -> bool {
        self.dav.iter().any(|t| t.eq_ignore_ascii_case(token))
    }

    pub fn allows(&self, method: &str) -> bool {
        self.methods.contains(&method.to_ascii_uppercase())
    }

    pub fn offers(&self, service: ServiceType) -> bool {
        self.supports(service.capability())
    }
}

/// Extract the `ETag` from a response header map, if present.
pub fn etag_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
