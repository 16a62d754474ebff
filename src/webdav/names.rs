//! Namespaces and names of the DAV properties this crate understands.

use std::fmt;

/// Namespace of the core WebDAV (RFC 4918, RFC 3744, RFC 5397) vocabulary.
pub const DAV: &str = "DAV:";
/// Namespace for CalDAV (RFC 4791).
pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";
/// Namespace for CardDAV (RFC 6352).
pub const CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";
/// Calendar Server extensions, home of `getctag`.
pub const CALENDARSERVER: &str = "http://calendarserver.org/ns/";
/// Apple iCal extensions, home of `calendar-color`.
pub const APPLE_ICAL: &str = "http://apple.com/ns/ical/";

/// A namespaced XML element name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyName {
    pub namespace: &'static str,
    pub name: &'static str,
}

impl PropertyName {
    pub const fn from_static(namespace: &'static str, name: &'static str) -> Self {
        Self { namespace, name }
    }

    pub fn matches(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }

    /// Prefix used for this namespace in request bodies built by
    /// [`crate::webdav::xml`].
    pub(crate) fn prefix(&self) -> &'static str {
        prefix_for(self.namespace)
    }
}

impl fmt::Debug for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.name)
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub(crate) fn prefix_for(namespace: &str) -> &'static str {
    match namespace {
        CALDAV => "C",
        CARDDAV => "CARD",
        CALENDARSERVER => "CS",
        APPLE_ICAL => "ICAL",
        _ => "D",
    }
}

/// Namespace declarations matching [`prefix_for`].
pub(crate) const NAMESPACE_DECLS: &str = concat!(
    r#"xmlns:D="DAV:" "#,
    r#"xmlns:C="urn:ietf:params:xml:ns:caldav" "#,
    r#"xmlns:CARD="urn:ietf:params:xml:ns:carddav" "#,
    r#"xmlns:CS="http://calendarserver.org/ns/" "#,
    r#"xmlns:ICAL="http://apple.com/ns/ical/""#,
);

pub const RESOURCETYPE: PropertyName = PropertyName::from_static(DAV, "resourcetype");
pub const DISPLAY_NAME: PropertyName = PropertyName::from_static(DAV, "displayname");
pub const GETETAG: PropertyName = PropertyName::from_static(DAV, "getetag");
pub const CURRENT_USER_PRINCIPAL: PropertyName =
    PropertyName::from_static(DAV, "current-user-principal");
/// From <https://www.rfc-editor.org/rfc/rfc3744#section-5.4>.
pub const CURRENT_USER_PRIVILEGE_SET: PropertyName =
    PropertyName::from_static(DAV, "current-user-privilege-set");

/// Collection tag; changes whenever any member changes.
pub const GETCTAG: PropertyName = PropertyName::from_static(CALENDARSERVER, "getctag");

pub const ADDRESSBOOK_HOME_SET: PropertyName =
    PropertyName::from_static(CARDDAV, "addressbook-home-set");
pub const ADDRESSBOOK_DESCRIPTION: PropertyName =
    PropertyName::from_static(CARDDAV, "addressbook-description");
pub const SUPPORTED_ADDRESS_DATA: PropertyName =
    PropertyName::from_static(CARDDAV, "supported-address-data");
pub const ADDRESS_DATA: PropertyName = PropertyName::from_static(CARDDAV, "address-data");

/// Defined in <https://www.rfc-editor.org/rfc/rfc4791#section-6.2.1>
pub const CALENDAR_HOME_SET: PropertyName = PropertyName::from_static(CALDAV, "calendar-home-set");
pub const CALENDAR_DESCRIPTION: PropertyName =
    PropertyName::from_static(CALDAV, "calendar-description");
pub const CALENDAR_TIMEZONE: PropertyName = PropertyName::from_static(CALDAV, "calendar-timezone");
pub const SUPPORTED_CALENDAR_COMPONENT_SET: PropertyName =
    PropertyName::from_static(CALDAV, "supported-calendar-component-set");
pub const CALENDAR_DATA: PropertyName = PropertyName::from_static(CALDAV, "calendar-data");
/// From <https://www.rfc-editor.org/rfc/rfc6638#section-2.4.1>
pub const CALENDAR_USER_ADDRESS_SET: PropertyName =
    PropertyName::from_static(CALDAV, "calendar-user-address-set");

/// A calendar's colour.
///
/// Not formally standardised but widespread. Values look like `#RRGGBB` or
/// `#RRGGBBAA`.
pub const CALENDAR_COLOR: PropertyName = PropertyName::from_static(APPLE_ICAL, "calendar-color");
