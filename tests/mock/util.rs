use davsync::{Credentials, ResourceLocation, TransportConfig, WebDavClient};
use wiremock::{MockServer, ResponseTemplate};

/// `alice:secret`
pub const ALICE_BASIC: &str = "Basic YWxpY2U6c2VjcmV0";

pub fn client(credentials: Option<Credentials>) -> WebDavClient {
    let config = TransportConfig {
        read_timeout_secs: 5,
        ..TransportConfig::default()
    };
    WebDavClient::new(config, credentials).expect("client")
}

pub fn alice() -> Credentials {
    Credentials::new("alice", "secret")
}

pub fn at(server: &MockServer, path: &str) -> ResourceLocation {
    ResourceLocation::parse(&format!("{}{path}", server.uri())).expect("mock URL")
}

pub fn multistatus(responses: &str) -> ResponseTemplate {
    ResponseTemplate::new(207)
        .insert_header("content-type", "application/xml; charset=utf-8")
        .set_body_string(format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav" xmlns:CARD="urn:ietf:params:xml:ns:carddav" xmlns:CS="http://calendarserver.org/ns/" xmlns:ICAL="http://apple.com/ns/ical/">{responses}</D:multistatus>"#
        ))
}

/// One `<D:response>` whose properties all succeeded.
pub fn ok_response(href: &str, props: &str) -> String {
    format!(
        "<D:response><D:href>{href}</D:href><D:propstat><D:prop>{props}</D:prop>\
         <D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>"
    )
}

pub fn principal_prop(href: &str) -> String {
    format!("<D:current-user-principal><D:href>{href}</D:href></D:current-user-principal>")
}

pub fn dav_options(tokens: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("dav", tokens)
        .insert_header("allow", "OPTIONS, GET, PUT, DELETE, PROPFIND, REPORT")
}
