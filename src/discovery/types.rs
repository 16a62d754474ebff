use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{DavError, Result};
use crate::webdav::location::ResourceLocation;
use crate::webdav::property::PropertyBag;
use crate::webdav::types::ServiceType;

/// What the user typed to start discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginTarget {
    /// An `http(s)` URL used as the candidate base URL.
    Url(ResourceLocation),
    /// `user@domain`; discovery starts from DNS for `domain`.
    Mailbox { user: String, domain: String },
}

impl LoginTarget {
    /// `user@domain` becomes a mailbox, anything with a scheme a URL, and a
    /// bare host name an `https` URL.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.contains("://") {
            return ResourceLocation::parse(input).map(LoginTarget::Url);
        }
        if let Some((user, domain)) = input.rsplit_once('@') {
            if user.is_empty() || domain.is_empty() || domain.contains('/') {
                return Err(DavError::InvalidUrl(format!("{input}: not a mailbox address")));
            }
            return Ok(LoginTarget::Mailbox {
                user: user.to_string(),
                domain: domain.to_ascii_lowercase(),
            });
        }
        ResourceLocation::parse(&format!("https://{input}")).map(LoginTarget::Url)
    }

    /// Domain for DNS-based discovery: the mailbox domain, or the host of an
    /// `https` URL.
    pub fn discovery_domain(&self) -> Option<&str> {
        match self {
            LoginTarget::Url(url) if url.is_https() => Some(url.host()),
            LoginTarget::Url(_) => None,
            LoginTarget::Mailbox { domain, .. } => Some(domain),
        }
    }
}

impl fmt::Display for LoginTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginTarget::Url(url) => write!(f, "{url}"),
            LoginTarget::Mailbox { user, domain } => write!(f, "{user}@{domain}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    AddressBook,
    Calendar,
}

impl CollectionKind {
    pub fn service(self) -> ServiceType {
        match self {
            CollectionKind::AddressBook => ServiceType::CardDav,
            CollectionKind::Calendar => ServiceType::CalDav,
        }
    }
}

/// The subset of a collection's properties kept after discovery or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub location: ResourceLocation,
    pub kind: CollectionKind,
    pub read_only: bool,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// ARGB; calendars only.
    pub color: Option<u32>,
    /// Raw `VTIMEZONE`; calendars only.
    pub timezone: Option<String>,
    pub supports_events: bool,
    pub supports_tasks: bool,
    /// The address book accepts vCard 4.0.
    pub vcard4: bool,
}

impl CollectionInfo {
    /// Build from a property snapshot. Returns `None` unless the resource type
    /// marks it as a collection of `service`.
    pub fn from_properties(
        location: &ResourceLocation,
        props: &PropertyBag,
        service: ServiceType,
    ) -> Option<Self> {
        let rt = props.resource_type();
        let kind = match service {
            ServiceType::CardDav if rt.addressbook => CollectionKind::AddressBook,
            ServiceType::CalDav if rt.calendar => CollectionKind::Calendar,
            _ => return None,
        };

        let (supports_events, supports_tasks) = match kind {
            CollectionKind::Calendar => match props.supported_components() {
                Some(comps) => (
                    comps.iter().any(|c| c == "VEVENT"),
                    comps.iter().any(|c| c == "VTODO"),
                ),
                // Without the property every component type is allowed.
                None => (true, true),
            },
            CollectionKind::AddressBook => (false, false),
        };

        Some(Self {
            location: location.as_collection(),
            kind,
            read_only: props.read_only(),
            display_name: props.display_name().map(str::to_string),
            description: props.description(service).map(str::to_string),
            color: props.color(),
            timezone: props.timezone().map(str::to_string),
            supports_events,
            supports_tasks,
            vcard4: kind == CollectionKind::AddressBook && props.supports_vcard4(),
        })
    }

    /// Display name, falling back to the last path segment.
    pub fn title(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let path = self.location.path().trim_end_matches('/');
        let segment = path.rsplit('/').next().unwrap_or(path);
        percent_encoding::percent_decode_str(segment)
            .decode_utf8_lossy()
            .into_owned()
    }
}

/// Everything discovered for one service type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub service: ServiceType,
    pub principal: Option<ResourceLocation>,
    pub home_sets: BTreeSet<ResourceLocation>,
    pub collections: BTreeMap<ResourceLocation, CollectionInfo>,
    /// Calendar user address without `mailto:`; CalDAV only.
    pub email: Option<String>,
}

impl ServiceInfo {
    pub fn new(service: ServiceType) -> Self {
        Self {
            service,
            principal: None,
            home_sets: BTreeSet::new(),
            collections: BTreeMap::new(),
            email: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.principal.is_some() || !self.home_sets.is_empty() || !self.collections.is_empty()
    }

    pub fn add_collection(&mut self, info: CollectionInfo) {
        self.collections.insert(info.location.clone(), info);
    }
}

/// Result of discovery for both services. A service that was not found is
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub target: LoginTarget,
    pub card_dav: Option<ServiceInfo>,
    pub cal_dav: Option<ServiceInfo>,
}

impl Configuration {
    pub fn service(&self, service: ServiceType) -> Option<&ServiceInfo> {
        match service {
            ServiceType::CardDav => self.card_dav.as_ref(),
            ServiceType::CalDav => self.cal_dav.as_ref(),
        }
    }
}
