use bytes::Bytes;

use crate::carddav::types::AddressObject;
use crate::common::auth::Credentials;
use crate::common::config::TransportConfig;
use crate::discovery::types::CollectionInfo;
use crate::error::Result;
use crate::webdav::client::WebDavClient;
use crate::webdav::location::ResourceLocation;
use crate::webdav::multistatus::DavResource;
use crate::webdav::types::{PropfindPurpose, PutMode, ServiceType};

/// CardDAV operations on top of a [`WebDavClient`].
///
/// Cloning `CardDavClient` is cheap and reuses the same connection pool.
#[derive(Clone, Debug)]
pub struct CardDavClient {
    dav: WebDavClient,
}

impl CardDavClient {
    pub fn new(config: TransportConfig, credentials: Option<Credentials>) -> Result<Self> {
        Ok(Self {
            dav: WebDavClient::new(config, credentials)?,
        })
    }

    pub fn with_client(dav: WebDavClient) -> Self {
        Self { dav }
    }

    pub fn webdav(&self) -> &WebDavClient {
        &self.dav
    }

    pub async fn supports_carddav(&self, location: &ResourceLocation) -> Result<bool> {
        self.dav.supports(location, ServiceType::CardDav).await
    }

    /// `addressbook-home-set` of a principal, resolved and deduplicated.
    pub async fn discover_addressbook_home_set(
        &self,
        principal: &ResourceLocation,
    ) -> Result<Vec<ResourceLocation>> {
        let result = self
            .dav
            .propfind(principal, PropfindPurpose::HomeSetLookup)
            .await?;
        let Some(resource) = result.into_single() else {
            return Ok(Vec::new());
        };
        let mut homes = resource
            .properties
            .home_set(ServiceType::CardDav)
            .iter()
            .map(|href| resource.location.resolve(href).map(|l| l.as_collection()))
            .collect::<Result<Vec<_>>>()?;
        homes.sort();
        homes.dedup();
        Ok(homes)
    }

    /// Address books directly below a home set.
    pub async fn list_addressbooks(
        &self,
        home_set: &ResourceLocation,
    ) -> Result<Vec<CollectionInfo>> {
        let result = self
            .dav
            .propfind(home_set, PropfindPurpose::MemberEnumeration(ServiceType::CardDav))
            .await?;
        let mut books: Vec<CollectionInfo> = result
            .members
            .iter()
            .filter_map(|m| {
                CollectionInfo::from_properties(&m.location, &m.properties, ServiceType::CardDav)
            })
            .collect();
        books.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(books)
    }

    pub async fn addressbook_multiget(
        &self,
        addressbook: &ResourceLocation,
        cards: &[ResourceLocation],
    ) -> Result<Vec<AddressObject>> {
        let resources = self
            .dav
            .multiget(addressbook, ServiceType::CardDav, cards)
            .await?;
        Ok(map_address_objects(resources))
    }

    pub async fn create(&self, location: &ResourceLocation, vcard: Bytes) -> Result<Option<String>> {
        self.dav
            .put(location, vcard, ServiceType::CardDav.content_type(), &PutMode::Create)
            .await
    }

    pub async fn update(
        &self,
        location: &ResourceLocation,
        vcard: Bytes,
        etag: Option<&str>,
    ) -> Result<Option<String>> {
        let mode = PutMode::Update(etag.map(str::to_string));
        self.dav
            .put(location, vcard, ServiceType::CardDav.content_type(), &mode)
            .await
    }

    pub async fn delete(&self, location: &ResourceLocation, etag: Option<&str>) -> Result<()> {
        self.dav.delete(location, etag).await
    }

    pub async fn get_ctag(&self, addressbook: &ResourceLocation) -> Result<Option<String>> {
        self.dav.get_ctag(addressbook).await
    }

    pub async fn list_etags(
        &self,
        addressbook: &ResourceLocation,
    ) -> Result<Vec<(ResourceLocation, String)>> {
        self.dav.list_member_etags(addressbook).await
    }
}

pub fn map_address_objects(resources: Vec<DavResource>) -> Vec<AddressObject> {
    resources
        .into_iter()
        .map(|r| AddressObject {
            etag: r.properties.etag().map(str::to_string),
            address_data: r.properties.data(ServiceType::CardDav).map(str::to_string),
            status: r.status,
            location: r.location,
        })
        .collect()
}
