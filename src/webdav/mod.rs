pub mod client;
pub mod location;
pub mod multistatus;
pub mod names;
pub mod property;
pub mod types;
pub mod xml;

pub use client::WebDavClient;
pub use location::ResourceLocation;
pub use multistatus::{DavResource, DavResponse, MultistatusResponse, PropfindResult, Propstat};
pub use names::PropertyName;
pub use property::{
    AddressDataType, DEFAULT_COLOR, Privileges, Property, PropertyBag, ResourceType, argb_to_hex,
    hex_to_argb,
};
pub use types::{DavCapabilities, Depth, PropfindPurpose, PutMode, ServiceType, etag_from_headers};
pub use xml::{build_multiget_body, build_propfind_body, escape_xml};
