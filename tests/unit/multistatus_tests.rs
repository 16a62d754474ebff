use davsync::webdav::multistatus::MultistatusResponse;
use davsync::{DavError, ResourceLocation, ServiceType};
use hyper::StatusCode;

fn loc(s: &str) -> ResourceLocation {
    ResourceLocation::parse(s).unwrap()
}

#[test]
fn test_partial_failure_keeps_good_properties() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/dav/a.ics</D:href>
    <D:propstat>
      <D:prop><D:displayname>Event A</D:displayname></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
    <D:propstat>
      <D:prop><D:getetag/></D:prop>
      <D:status>HTTP/1.1 404 Not Found</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let ms = MultistatusResponse::parse(xml.as_bytes()).expect("decode succeeds");
    assert_eq!(ms.responses.len(), 1);
    let response = &ms.responses[0];
    assert_eq!(response.propstats.len(), 2);
    assert_eq!(response.propstats[1].status, Some(StatusCode::NOT_FOUND));

    let props = response.properties();
    assert_eq!(props.display_name(), Some("Event A"));
    assert!(props.etag().is_none());
}

#[test]
fn test_single_self_response_is_not_a_member() {
    let xml = r#"<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/dav/calendars/alice/work/</D:href>
    <D:propstat>
      <D:prop>
        <D:resourcetype><D:collection/><C:calendar/></D:resourcetype>
        <D:displayname>Work</D:displayname>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let request = loc("https://dav.example.com/dav/calendars/alice/work");
    let folded = MultistatusResponse::parse(xml.as_bytes())
        .unwrap()
        .fold(&request);
    assert!(folded.members.is_empty());
    let own = folded.own.expect("self properties");
    assert_eq!(own.display_name(), Some("Work"));
    assert!(own.resource_type().calendar);
}

#[test]
fn test_members_are_resolved_and_collections_get_slash() {
    let xml = r#"<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/cal/alice/</D:href>
    <D:propstat><D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status></D:propstat>
  </D:response>
  <D:response>
    <D:href>https://dav.example.com/cal/alice/home</D:href>
    <D:propstat><D:prop><D:resourcetype><D:collection/><C:calendar/></D:resourcetype>
      <C:calendar-home-set><D:href>/ignored/</D:href></C:calendar-home-set></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status></D:propstat>
  </D:response>
  <D:response>
    <D:href>/cal/alice/My%20Tasks/</D:href>
    <D:propstat><D:prop><D:displayname>Tasks &amp; Todos</D:displayname>
      <D:resourcetype><D:collection/><C:calendar/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status></D:propstat>
  </D:response>
</D:multistatus>"#;

    let folded = MultistatusResponse::parse(xml.as_bytes())
        .unwrap()
        .fold(&loc("https://dav.example.com/cal/alice/"));
    assert!(folded.own.is_some());
    let hrefs: Vec<&str> = folded.members.iter().map(|m| m.location.as_str()).collect();
    assert_eq!(
        hrefs,
        [
            "https://dav.example.com/cal/alice/home/",
            "https://dav.example.com/cal/alice/My%20Tasks/"
        ]
    );
    assert_eq!(
        folded.members[1].properties.display_name(),
        Some("Tasks & Todos")
    );
    assert_eq!(
        folded.members[0].properties.home_set(ServiceType::CalDav),
        ["/ignored/".to_string()]
    );
}

#[test]
fn test_rewritten_href_still_answers_depth_zero() {
    let xml = r#"<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/internal/principals/alice/</D:href>
    <D:propstat><D:prop><D:current-user-principal><D:href>/principals/alice/</D:href></D:current-user-principal></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status></D:propstat>
  </D:response>
</D:multistatus>"#;
    let folded = MultistatusResponse::parse(xml.as_bytes())
        .unwrap()
        .fold(&loc("https://h/.well-known/caldav"));
    let single = folded.into_single().expect("one resource");
    assert_eq!(single.properties.current_user_principal(), Some("/principals/alice/"));
}

#[test]
fn test_malformed_documents_are_protocol_errors() {
    for body in [
        &b""[..],
        b"not xml at all",
        b"<D:multistatus xmlns:D=\"DAV:\"><D:response>",
        b"<D:error xmlns:D=\"DAV:\"/>",
    ] {
        let err = MultistatusResponse::parse(body).unwrap_err();
        assert!(matches!(err, DavError::Protocol(_)), "{err:?}");
    }
}
