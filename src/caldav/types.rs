use hyper::StatusCode;

use crate::webdav::location::ResourceLocation;

/// Calendar object (event or task) returned by a `calendar-multiget` REPORT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarObject {
    pub location: ResourceLocation,
    pub etag: Option<String>,
    /// Raw iCalendar text, handed to the caller unparsed.
    pub calendar_data: Option<String>,
    /// Response-level status; `404` for members that vanished.
    pub status: Option<StatusCode>,
}

impl CalendarObject {
    pub fn is_missing(&self) -> bool {
        self.status.is_some_and(|s| s == StatusCode::NOT_FOUND)
            || (self.calendar_data.is_none() && self.etag.is_none())
    }
}
