//! Finding CalDAV/CardDAV principals, home sets and collections for an
//! account, and keeping the collection list fresh.

pub mod dns;
pub mod finder;
pub mod refresh;
pub mod types;

pub use dns::{ServiceResolver, SrvTarget, SystemResolver};
pub use finder::{DavResourceFinder, FinderOptions};
pub use refresh::{CollectionRefresher, RefreshEvent, RefreshOutcome, RefreshRegistry};
pub use types::{CollectionInfo, CollectionKind, Configuration, LoginTarget, ServiceInfo};
