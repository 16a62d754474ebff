use bytes::Bytes;

use crate::caldav::types::CalendarObject;
use crate::common::auth::Credentials;
use crate::common::config::TransportConfig;
use crate::discovery::types::CollectionInfo;
use crate::error::Result;
use crate::webdav::client::WebDavClient;
use crate::webdav::location::ResourceLocation;
use crate::webdav::multistatus::DavResource;
use crate::webdav::types::{PropfindPurpose, PutMode, ServiceType};

/// CalDAV operations on top of a [`WebDavClient`].
///
/// Cloning `CalDavClient` is cheap and reuses the same connection pool.
///
/// # Example
/// ```no_run
/// use davsync::{CalDavClient, Credentials, ResourceLocation, TransportConfig};
/// use anyhow::Result;
///
/// # async fn example() -> Result<()> {
/// let client = CalDavClient::new(
///     TransportConfig::default(),
///     Some(Credentials::new("user01", "secret")),
/// )?;
/// let home = ResourceLocation::parse("https://cal.example.com/dav/calendars/user01/")?;
/// for calendar in client.list_calendars(&home).await? {
///     println!("{} ({})", calendar.title(), calendar.location);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CalDavClient {
    dav: WebDavClient,
}

impl CalDavClient {
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

    /// Whether `location` advertises `calendar-access`.
    pub async fn supports_caldav(&self, location: &ResourceLocation) -> Result<bool> {
        self.dav.supports(location, ServiceType::CalDav).await
    }

    /// `calendar-home-set` of a principal, resolved and deduplicated.
    pub async fn discover_calendar_home_set(
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
            .home_set(ServiceType::CalDav)
            .iter()
            .map(|href| resource.location.resolve(href).map(|l| l.as_collection()))
            .collect::<Result<Vec<_>>>()?;
        homes.sort();
        homes.dedup();
        Ok(homes)
    }

    /// Calendars directly below a calendar home set (`Depth: 1` PROPFIND).
    pub async fn list_calendars(&self, home_set: &ResourceLocation) -> Result<Vec<CollectionInfo>> {
        let result = self
            .dav
            .propfind(home_set, PropfindPurpose::MemberEnumeration(ServiceType::CalDav))
            .await?;
        let mut calendars: Vec<CollectionInfo> = result
            .members
            .iter()
            .filter_map(|m| CollectionInfo::from_properties(&m.location, &m.properties, ServiceType::CalDav))
            .collect();
        calendars.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(calendars)
    }

    /// Fetch specific calendar objects via `calendar-multiget`.
    pub async fn calendar_multiget(
        &self,
        calendar: &ResourceLocation,
        objects: &[ResourceLocation],
    ) -> Result<Vec<CalendarObject>> {
        let resources = self
            .dav
            .multiget(calendar, ServiceType::CalDav, objects)
            .await?;
        Ok(map_calendar_objects(resources))
    }

    /// Store a new object; fails with `PreconditionFailed` if one exists.
    pub async fn create(&self, location: &ResourceLocation, ical: Bytes) -> Result<Option<String>> {
        self.dav
            .put(location, ical, ServiceType::CalDav.content_type(), &PutMode::Create)
            .await
    }

    /// Overwrite an existing object, guarded by `etag` when given.
    pub async fn update(
        &self,
        location: &ResourceLocation,
        ical: Bytes,
        etag: Option<&str>,
    ) -> Result<Option<String>> {
        let mode = PutMode::Update(etag.map(str::to_string));
        self.dav
            .put(location, ical, ServiceType::CalDav.content_type(), &mode)
            .await
    }

    pub async fn delete(&self, location: &ResourceLocation, etag: Option<&str>) -> Result<()> {
        self.dav.delete(location, etag).await
    }

    pub async fn get_ctag(&self, calendar: &ResourceLocation) -> Result<Option<String>> {
        self.dav.get_ctag(calendar).await
    }

    /// ETags of every object in a calendar.
    pub async fn list_etags(
        &self,
        calendar: &ResourceLocation,
    ) -> Result<Vec<(ResourceLocation, String)>> {
        self.dav.list_member_etags(calendar).await
    }
}

pub fn map_calendar_objects(resources: Vec<DavResource>) -> Vec<CalendarObject> {
    resources
        .into_iter()
        .map(|r| CalendarObject {
            etag: r.properties.etag().map(str::to_string),
            calendar_data: r.properties.data(ServiceType::CalDav).map(str::to_string),
            status: r.status,
            location: r.location,
        })
        .collect()
}
