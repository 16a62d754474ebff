use hyper::StatusCode;

use crate::webdav::location::ResourceLocation;

/// Address object (vCard) returned by an `addressbook-multiget` REPORT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressObject {
    pub location: ResourceLocation,
    pub etag: Option<String>,
    /// Raw vCard text, handed to the caller unparsed.
    pub address_data: Option<String>,
    pub status: Option<StatusCode>,
}
