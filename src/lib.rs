//! CalDAV/CardDAV protocol client and resource discovery for Rust.
//!
//! `davsync` is the protocol core of a synchronization client: it finds a
//! user's calendars and address books from little more than an email address
//! or a server URL, and performs the WebDAV operations needed to keep them in
//! sync. It is built on hyper 1.x, rustls and tokio.
//!
//! # Features
//!
//! - One HTTP transport with connection pooling, HTTP/2, gzip, cookies,
//!   preemptive or reactive Basic authentication and bounded redirects
//! - Pluggable certificate trust for self-signed servers
//! - Tolerant `207 Multi-Status` decoding: a failed property is simply absent
//! - Typed property catalog (display name, color, CTag, ETag, home sets, ...)
//! - Discovery via the user URL, `/.well-known/` and DNS SRV/TXT records
//! - At most one collection refresh per account at a time
//!
//! # Examples
//!
//! ## Discovering an account
//!
//! ```no_run
//! use davsync::{Credentials, DavResourceFinder, LoginTarget, TransportConfig, WebDavClient};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = WebDavClient::new(
//!         TransportConfig::default(),
//!         Some(Credentials::new("alice", "secret")),
//!     )?;
//!     let finder = DavResourceFinder::new(client)?;
//!
//!     let target = LoginTarget::parse("alice@example.com")?;
//!     let config = finder.find_initial_configuration(&target).await?;
//!
//!     if let Some(cal) = &config.cal_dav {
//!         println!("CalDAV principal: {:?}, email: {:?}", cal.principal, cal.email);
//!         for calendar in cal.collections.values() {
//!             println!("  calendar {}", calendar.title());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Syncing a calendar
//!
//! ```no_run
//! use davsync::{CalDavClient, Credentials, ResourceLocation, TransportConfig};
//! use bytes::Bytes;
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = CalDavClient::new(
//!         TransportConfig::default(),
//!         Some(Credentials::new("alice", "secret").preemptive(true)),
//!     )?;
//!     let calendar = ResourceLocation::parse("https://dav.example.com/calendars/alice/work/")?;
//!
//!     let ctag = client.get_ctag(&calendar).await?;
//!     println!("CTag: {ctag:?}");
//!
//!     let etags = client.list_etags(&calendar).await?;
//!     let members: Vec<_> = etags.into_iter().map(|(location, _)| location).collect();
//!     for object in client.calendar_multiget(&calendar, &members).await? {
//!         println!("{} {:?}", object.location, object.etag);
//!     }
//!
//!     let event = calendar.resolve("new-event.ics")?;
//!     let etag = client
//!         .create(&event, Bytes::from_static(b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n"))
//!         .await?;
//!     client.delete(&event, etag.as_deref()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Refreshing collections once per account
//!
//! ```no_run
//! use davsync::{CollectionRefresher, RefreshRegistry, ServiceInfo};
//! # async fn example(refresher: CollectionRefresher, info: ServiceInfo) {
//! let registry: RefreshRegistry<u64, ServiceInfo> = RefreshRegistry::new();
//! let mut events = registry.subscribe();
//!
//! let outcome = registry
//!     .refresh(1, || {
//!         let refresher = refresher.clone();
//!         async move { refresher.refresh(info).await }
//!     })
//!     .await;
//! println!("{:?} / {:?}", outcome.is_ok(), events.try_recv());
//! # }
//! ```

pub mod caldav;
pub mod carddav;
pub mod common;
pub mod discovery;
pub mod error;
pub mod webdav;

pub use caldav::{CalDavClient, CalendarObject};
pub use carddav::{AddressObject, CardDavClient};
pub use common::{
    AcceptedCertificates, CertificateTrust, CookieJar, Credentials, Password, RejectUntrusted,
    Transport, TransportBuilder, TransportConfig,
};
pub use discovery::{
    CollectionInfo, CollectionKind, CollectionRefresher, Configuration, DavResourceFinder,
    FinderOptions, LoginTarget, RefreshEvent, RefreshRegistry, ServiceInfo, ServiceResolver,
    SrvTarget, SystemResolver,
};
pub use error::{DavError, Result};
pub use webdav::{
    DavCapabilities, DavResource, Depth, MultistatusResponse, Property, PropertyBag,
    PropertyName, PropfindPurpose, PropfindResult, PutMode, ResourceLocation, ServiceType,
    WebDavClient,
};
