pub mod client;
pub mod types;

pub use client::{CardDavClient, map_address_objects};
pub use types::AddressObject;
