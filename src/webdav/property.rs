//! Typed values for the supported DAV properties.
//!
//! Decoding is driven by a flat table ([`CATALOG`]) mapping each
//! [`PropertyName`] to a decode function. Every decode is optional: a property
//! the server did not return is simply absent from the [`PropertyBag`], and a
//! malformed value degrades to a documented fallback where one exists.

use std::collections::BTreeMap;

use crate::webdav::names::{self, PropertyName};
use crate::webdav::types::ServiceType;
use crate::webdav::xml::XmlElement;

/// Color used when a server sends an unparsable `calendar-color`.
pub const DEFAULT_COLOR: u32 = 0xFF8B_C34A;

/// Flags found in `resourcetype`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceType {
    pub collection: bool,
    pub addressbook: bool,
    pub calendar: bool,
    pub principal: bool,
}

/// Privileges granted to the current user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Privileges {
    pub all: bool,
    pub bind: bool,
    pub unbind: bool,
    pub write: bool,
    pub write_content: bool,
}

impl Privileges {
    pub fn read_only(&self) -> bool {
        !(self.all || self.write || (self.write_content && self.bind && self.unbind))
    }
}

/// One entry of `supported-address-data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressDataType {
    pub content_type: String,
    pub version: String,
}

impl AddressDataType {
    pub fn is_vcard4(&self) -> bool {
        self.content_type.eq_ignore_ascii_case("text/vcard") && self.version == "4.0"
    }
}

/// A decoded property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    ResourceType(ResourceType),
    DisplayName(String),
    GetCTag(String),
    GetETag(String),
    /// Raw href, relative to the request it came from.
    CurrentUserPrincipal(String),
    CurrentUserPrivilegeSet(Privileges),
    AddressbookHomeSet(Vec<String>),
    CalendarHomeSet(Vec<String>),
    AddressbookDescription(String),
    CalendarDescription(String),
    /// ARGB, alpha in the top byte.
    CalendarColor(u32),
    /// Raw `VTIMEZONE` text.
    CalendarTimezone(String),
    /// Component names such as `VEVENT` or `VTODO`.
    SupportedCalendarComponentSet(Vec<String>),
    SupportedAddressData(Vec<AddressDataType>),
    AddressData(String),
    CalendarData(String),
    CalendarUserAddressSet(Vec<String>),
}

impl Property {
    pub fn name(&self) -> PropertyName {
        match self {
            Property::ResourceType(_) => names::RESOURCETYPE,
            Property::DisplayName(_) => names::DISPLAY_NAME,
            Property::GetCTag(_) => names::GETCTAG,
            Property::GetETag(_) => names::GETETAG,
            Property::CurrentUserPrincipal(_) => names::CURRENT_USER_PRINCIPAL,
            Property::CurrentUserPrivilegeSet(_) => names::CURRENT_USER_PRIVILEGE_SET,
            Property::AddressbookHomeSet(_) => names::ADDRESSBOOK_HOME_SET,
            Property::CalendarHomeSet(_) => names::CALENDAR_HOME_SET,
            Property::AddressbookDescription(_) => names::ADDRESSBOOK_DESCRIPTION,
            Property::CalendarDescription(_) => names::CALENDAR_DESCRIPTION,
            Property::CalendarColor(_) => names::CALENDAR_COLOR,
            Property::CalendarTimezone(_) => names::CALENDAR_TIMEZONE,
            Property::SupportedCalendarComponentSet(_) => names::SUPPORTED_CALENDAR_COMPONENT_SET,
            Property::SupportedAddressData(_) => names::SUPPORTED_ADDRESS_DATA,
            Property::AddressData(_) => names::ADDRESS_DATA,
            Property::CalendarData(_) => names::CALENDAR_DATA,
            Property::CalendarUserAddressSet(_) => names::CALENDAR_USER_ADDRESS_SET,
        }
    }
}

/// One row of the decode table.
pub struct PropertySpec {
    pub name: PropertyName,
    pub decode: fn(&XmlElement) -> Option<Property>,
}

pub static CATALOG: &[PropertySpec] = &[
    PropertySpec { name: names::RESOURCETYPE, decode: decode_resource_type },
    PropertySpec { name: names::DISPLAY_NAME, decode: |e| text(e).map(Property::DisplayName) },
    PropertySpec { name: names::GETCTAG, decode: |e| text(e).map(Property::GetCTag) },
    PropertySpec { name: names::GETETAG, decode: |e| text(e).map(Property::GetETag) },
    PropertySpec { name: names::CURRENT_USER_PRINCIPAL, decode: decode_current_user_principal },
    PropertySpec { name: names::CURRENT_USER_PRIVILEGE_SET, decode: decode_privileges },
    PropertySpec {
        name: names::ADDRESSBOOK_HOME_SET,
        decode: |e| Some(Property::AddressbookHomeSet(hrefs(e))),
    },
    PropertySpec {
        name: names::CALENDAR_HOME_SET,
        decode: |e| Some(Property::CalendarHomeSet(hrefs(e))),
    },
    PropertySpec {
        name: names::ADDRESSBOOK_DESCRIPTION,
        decode: |e| text(e).map(Property::AddressbookDescription),
    },
    PropertySpec {
        name: names::CALENDAR_DESCRIPTION,
        decode: |e| text(e).map(Property::CalendarDescription),
    },
    PropertySpec { name: names::CALENDAR_COLOR, decode: decode_color },
    PropertySpec {
        name: names::CALENDAR_TIMEZONE,
        decode: |e| text(e).map(Property::CalendarTimezone),
    },
    PropertySpec { name: names::SUPPORTED_CALENDAR_COMPONENT_SET, decode: decode_components },
    PropertySpec { name: names::SUPPORTED_ADDRESS_DATA, decode: decode_address_data_types },
    PropertySpec { name: names::ADDRESS_DATA, decode: |e| Some(Property::AddressData(e.text.clone())) },
    PropertySpec { name: names::CALENDAR_DATA, decode: |e| Some(Property::CalendarData(e.text.clone())) },
    PropertySpec {
        name: names::CALENDAR_USER_ADDRESS_SET,
        decode: |e| Some(Property::CalendarUserAddressSet(hrefs(e))),
    },
];

/// Decode one element found inside `<D:prop>`. Unknown properties and values
/// that cannot be interpreted yield `None`.
pub fn decode_property(element: &XmlElement) -> Option<Property> {
    CATALOG
        .iter()
        .find(|spec| element.is(&spec.name))
        .and_then(|spec| (spec.decode)(element))
}

fn text(e: &XmlElement) -> Option<String> {
    e.trimmed_text().map(str::to_string)
}

fn hrefs(e: &XmlElement) -> Vec<String> {
    e.children_named(&HREF)
        .filter_map(XmlElement::trimmed_text)
        .map(str::to_string)
        .collect()
}

const HREF: PropertyName = PropertyName::from_static(names::DAV, "href");

fn decode_resource_type(e: &XmlElement) -> Option<Property> {
    let mut rt = ResourceType::default();
    for child in &e.children {
        match (child.namespace.as_str(), child.name.as_str()) {
            (names::DAV, "collection") => rt.collection = true,
            (names::DAV, "principal") => rt.principal = true,
            (names::CARDDAV, "addressbook") => rt.addressbook = true,
            (names::CALDAV, "calendar") => rt.calendar = true,
            _ => {}
        }
    }
    Some(Property::ResourceType(rt))
}

fn decode_current_user_principal(e: &XmlElement) -> Option<Property> {
    // `<D:unauthenticated/>` carries no href and is treated as absent.
    e.child(&HREF)
        .and_then(XmlElement::trimmed_text)
        .map(|href| Property::CurrentUserPrincipal(href.to_string()))
}

fn decode_privileges(e: &XmlElement) -> Option<Property> {
    let mut privileges = Privileges::default();
    let granted = e
        .children
        .iter()
        .filter(|c| c.namespace == names::DAV && c.name == "privilege")
        .flat_map(|p| p.children.iter())
        .filter(|p| p.namespace == names::DAV);
    for privilege in granted {
        match privilege.name.as_str() {
            "all" => privileges.all = true,
            "bind" => privileges.bind = true,
            "unbind" => privileges.unbind = true,
            "write" => privileges.write = true,
            "write-content" => privileges.write_content = true,
            _ => {}
        }
    }
    Some(Property::CurrentUserPrivilegeSet(privileges))
}

fn decode_color(e: &XmlElement) -> Option<Property> {
    let color = e.trimmed_text().and_then(hex_to_argb).unwrap_or_else(|| {
        tracing::debug!(value = %e.text, "unparsable calendar-color, using default");
        DEFAULT_COLOR
    });
    Some(Property::CalendarColor(color))
}

fn decode_components(e: &XmlElement) -> Option<Property> {
    let comps = e
        .children
        .iter()
        .filter(|c| c.namespace == names::CALDAV && c.name == "comp")
        .filter_map(|c| c.attribute("name"))
        .map(str::to_ascii_uppercase)
        .collect();
    Some(Property::SupportedCalendarComponentSet(comps))
}

fn decode_address_data_types(e: &XmlElement) -> Option<Property> {
    let types = e
        .children
        .iter()
        .filter(|c| c.namespace == names::CARDDAV && c.name == "address-data-type")
        .map(|c| AddressDataType {
            content_type: c.attribute("content-type").unwrap_or("text/vcard").to_string(),
            version: c.attribute("version").unwrap_or("3.0").to_string(),
        })
        .collect();
    Some(Property::SupportedAddressData(types))
}

/// Parse `#RRGGBB` or `#RRGGBBAA` into ARGB. A missing alpha means opaque.
pub fn hex_to_argb(hex: &str) -> Option<u32> {
    let digits = hex.trim().strip_prefix('#')?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match digits.len() {
        6 => u32::from_str_radix(digits, 16).ok().map(|rgb| 0xFF00_0000 | rgb),
        8 => {
            let rgba = u32::from_str_radix(digits, 16).ok()?;
            Some(rgba.rotate_right(8))
        }
        _ => None,
    }
}

/// Render ARGB as `#RRGGBBAA`.
pub fn argb_to_hex(argb: u32) -> String {
    format!("#{:08X}", argb.rotate_left(8))
}

/// Properties of one resource, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag(BTreeMap<PropertyName, Property>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: Property) {
        self.0.insert(property.name(), property);
    }

    pub fn get(&self, name: &PropertyName) -> Option<&Property> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &PropertyName) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &PropertyName) -> Option<Property> {
        self.0.remove(name)
    }

    /// Later values win.
    pub fn merge(&mut self, other: PropertyBag) {
        self.0.extend(other.0);
    }

    /// Forget change tags after a write so the next sync refetches them.
    pub fn invalidate_tags(&mut self) {
        self.0.remove(&names::GETCTAG);
        self.0.remove(&names::GETETAG);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.0.values()
    }

    pub fn resource_type(&self) -> ResourceType {
        match self.get(&names::RESOURCETYPE) {
            Some(Property::ResourceType(rt)) => *rt,
            _ => ResourceType::default(),
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self.get(&names::DISPLAY_NAME) {
            Some(Property::DisplayName(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn ctag(&self) -> Option<&str> {
        match self.get(&names::GETCTAG) {
            Some(Property::GetCTag(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn etag(&self) -> Option<&str> {
        match self.get(&names::GETETAG) {
            Some(Property::GetETag(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn current_user_principal(&self) -> Option<&str> {
        match self.get(&names::CURRENT_USER_PRINCIPAL) {
            Some(Property::CurrentUserPrincipal(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn privileges(&self) -> Option<Privileges> {
        match self.get(&names::CURRENT_USER_PRIVILEGE_SET) {
            Some(Property::CurrentUserPrivilegeSet(p)) => Some(*p),
            _ => None,
        }
    }

    /// Without a privilege set the collection is assumed writable.
    pub fn read_only(&self) -> bool {
        self.privileges().is_some_and(|p| p.read_only())
    }

    pub fn home_set(&self, service: ServiceType) -> &[String] {
        match (service, self.get(&service.home_set_property())) {
            (ServiceType::CardDav, Some(Property::AddressbookHomeSet(v)))
            | (ServiceType::CalDav, Some(Property::CalendarHomeSet(v))) => v.as_slice(),
            _ => &[][..],
        }
    }

    pub fn description(&self, service: ServiceType) -> Option<&str> {
        match self.get(&service.description_property()) {
            Some(Property::AddressbookDescription(v) | Property::CalendarDescription(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn color(&self) -> Option<u32> {
        match self.get(&names::CALENDAR_COLOR) {
            Some(Property::CalendarColor(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn timezone(&self) -> Option<&str> {
        match self.get(&names::CALENDAR_TIMEZONE) {
            Some(Property::CalendarTimezone(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn supported_components(&self) -> Option<&[String]> {
        match self.get(&names::SUPPORTED_CALENDAR_COMPONENT_SET) {
            Some(Property::SupportedCalendarComponentSet(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn supports_vcard4(&self) -> bool {
        match self.get(&names::SUPPORTED_ADDRESS_DATA) {
            Some(Property::SupportedAddressData(types)) => types.iter().any(AddressDataType::is_vcard4),
            _ => false,
        }
    }

    /// Address or calendar payload returned by a multiget.
    pub fn data(&self, service: ServiceType) -> Option<&str> {
        match self.get(&service.data_property()) {
            Some(Property::AddressData(v) | Property::CalendarData(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn calendar_user_addresses(&self) -> &[String] {
        match self.get(&names::CALENDAR_USER_ADDRESS_SET) {
            Some(Property::CalendarUserAddressSet(v)) => v.as_slice(),
            _ => &[][..],
        }
    }
}

impl FromIterator<Property> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut bag = Self::new();
        for p in iter {
            bag.insert(p);
        }
        bag
    }
}
