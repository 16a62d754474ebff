pub mod client;
pub mod types;

pub use client::{CalDavClient, map_calendar_objects};
pub use types::CalendarObject;
