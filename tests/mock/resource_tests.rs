use bytes::Bytes;
use davsync::{CalDavClient, CardDavClient, DavError, PropfindPurpose, PutMode, ServiceType};
use hyper::StatusCode;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::util::{at, client, dav_options, multistatus, ok_response};

#[tokio::test]
async fn test_options_reports_capabilities() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(dav_options("1, 2, 3, access-control, calendar-access"))
        .mount(&server)
        .await;

    let caps = client(None).options(&at(&server, "/")).await.unwrap();
    assert!(caps.supports("calendar-access"));
    assert!(caps.supports("ACCESS-CONTROL"));
    assert!(!caps.offers(ServiceType::CardDav));
    assert!(caps.allows("propfind"));
    assert!(!caps.allows("MKCALENDAR"));
}

#[tokio::test]
async fn test_create_uses_if_none_match_and_returns_etag() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/cal/work/e1.ics"))
        .and(header("if-none-match", "*"))
        .and(header("content-type", "text/calendar; charset=utf-8"))
        .respond_with(ResponseTemplate::new(201).insert_header("etag", "\"e1\""))
        .expect(1)
        .mount(&server)
        .await;

    let caldav = CalDavClient::with_client(client(None));
    let etag = caldav
        .create(
            &at(&server, "/cal/work/e1.ics"),
            Bytes::from_static(b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n"),
        )
        .await
        .unwrap();
    assert_eq!(etag.as_deref(), Some("\"e1\""));
}

#[tokio::test]
async fn test_update_with_stale_etag_fails_with_precondition() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("if-match", "\"old\""))
        .and(header("content-type", "text/vcard; charset=utf-8"))
        .respond_with(ResponseTemplate::new(412))
        .expect(1)
        .mount(&server)
        .await;

    let carddav = CardDavClient::with_client(client(None));
    let err = carddav
        .update(
            &at(&server, "/book/a.vcf"),
            Bytes::from_static(b"BEGIN:VCARD\r\nEND:VCARD\r\n"),
            Some("\"old\""),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DavError::PreconditionFailed));
}

#[tokio::test]
async fn test_update_without_etag_requires_existing_resource() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("if-match", "*"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let etag = client(None)
        .put(
            &at(&server, "/book/a.vcf"),
            Bytes::from_static(b"x"),
            "text/vcard",
            &PutMode::Update(None),
        )
        .await
        .unwrap();
    assert_eq!(etag, None);
}

#[tokio::test]
async fn test_delete_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/cal/e1.ics"))
        .and(header("if-match", "\"e1\""))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/cal/e2.ics"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dav = client(None);
    dav.delete(&at(&server, "/cal/e1.ics"), Some("\"e1\"")).await.unwrap();
    dav.delete(&at(&server, "/cal/e2.ics"), None).await.unwrap();

    let err = dav.delete(&at(&server, "/cal/gone.ics"), None).await.unwrap_err();
    assert!(matches!(err, DavError::NotFound));

    let unconditional = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.url.path() == "/cal/e2.ics")
        .expect("unconditional DELETE");
    assert!(unconditional.headers.get("if-match").is_none());
}

#[tokio::test]
async fn test_service_support_checks() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .and(path("/cal/"))
        .respond_with(dav_options("1, 2, calendar-access"))
        .mount(&server)
        .await;
    Mock::given(method("OPTIONS"))
        .and(path("/card/"))
        .respond_with(dav_options("1, 2, addressbook"))
        .mount(&server)
        .await;

    let caldav = CalDavClient::with_client(client(None));
    let carddav = CardDavClient::with_client(client(None));
    assert!(caldav.supports_caldav(&at(&server, "/cal/")).await.unwrap());
    assert!(!caldav.supports_caldav(&at(&server, "/card/")).await.unwrap());
    assert!(carddav.supports_carddav(&at(&server, "/card/")).await.unwrap());
    assert!(!carddav.supports_carddav(&at(&server, "/cal/")).await.unwrap());
}

#[tokio::test]
async fn test_propfind_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(path("/error/"))
        .respond_with(ResponseTemplate::new(507))
        .mount(&server)
        .await;
    Mock::given(path("/plain/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html/>"))
        .mount(&server)
        .await;
    Mock::given(path("/empty/"))
        .respond_with(ResponseTemplate::new(207))
        .mount(&server)
        .await;

    let dav = client(None);
    match dav.propfind(&at(&server, "/error/"), PropfindPurpose::CTag).await {
        Err(DavError::Http { status, .. }) => assert_eq!(status, StatusCode::INSUFFICIENT_STORAGE),
        other => panic!("unexpected {other:?}"),
    }
    for p in ["/plain/", "/empty/"] {
        let err = dav.propfind(&at(&server, p), PropfindPurpose::CTag).await.unwrap_err();
        assert!(matches!(err, DavError::Protocol(_)), "{p}: {err:?}");
    }
}

#[tokio::test]
async fn test_ctag_and_member_etags() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/cal/work/"))
        .and(header("depth", "0"))
        .respond_with(multistatus(&ok_response("/cal/work/", "<CS:getctag>ctag-7</CS:getctag>")))
        .mount(&server)
        .await;
    let listing = [
        ok_response(
            "/cal/work/",
            "<D:resourcetype><D:collection/><C:calendar/></D:resourcetype><CS:getctag>ctag-7</CS:getctag>",
        ),
        ok_response("/cal/work/a.ics", "<D:getetag>\"a1\"</D:getetag><D:resourcetype/>"),
        ok_response("/cal/work/b.ics", "<D:getetag>\"b1\"</D:getetag>"),
        ok_response("/cal/work/sub/", "<D:resourcetype><D:collection/></D:resourcetype>"),
    ]
    .concat();
    Mock::given(method("PROPFIND"))
        .and(path("/cal/work/"))
        .and(header("depth", "1"))
        .and(body_string_contains("getetag"))
        .respond_with(multistatus(&listing))
        .mount(&server)
        .await;

    let caldav = CalDavClient::with_client(client(None));
    let calendar = at(&server, "/cal/work/");
    assert_eq!(caldav.get_ctag(&calendar).await.unwrap().as_deref(), Some("ctag-7"));

    let etags = caldav.list_etags(&calendar).await.unwrap();
    assert_eq!(
        etags,
        vec![
            (at(&server, "/cal/work/a.ics"), "\"a1\"".to_string()),
            (at(&server, "/cal/work/b.ics"), "\"b1\"".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_calendar_multiget_maps_objects() {
    let server = MockServer::start().await;
    let body = [
        ok_response(
            "/cal/work/a.ics",
            "<D:getetag>\"a1\"</D:getetag><C:calendar-data>BEGIN:VCALENDAR&#13;\nEND:VCALENDAR</C:calendar-data>",
        ),
        "<D:response><D:href>/cal/work/gone.ics</D:href><D:status>HTTP/1.1 404 Not Found</D:status></D:response>".to_string(),
    ]
    .concat();
    Mock::given(method("REPORT"))
        .and(path("/cal/work/"))
        .and(body_string_contains("calendar-multiget"))
        .and(body_string_contains("<D:href>/cal/work/a.ics</D:href>"))
        .and(body_string_contains("<D:href>/cal/work/gone.ics</D:href>"))
        .respond_with(multistatus(&body))
        .expect(1)
        .mount(&server)
        .await;

    let caldav = CalDavClient::with_client(client(None));
    let objects = caldav
        .calendar_multiget(
            &at(&server, "/cal/work/"),
            &[at(&server, "/cal/work/a.ics"), at(&server, "/cal/work/gone.ics")],
        )
        .await
        .unwrap();

    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].etag.as_deref(), Some("\"a1\""));
    assert_eq!(
        objects[0].calendar_data.as_deref(),
        Some("BEGIN:VCALENDAR\r\nEND:VCALENDAR")
    );
    assert!(!objects[0].is_missing());
    assert!(objects[1].is_missing());

    assert!(caldav
        .calendar_multiget(&at(&server, "/cal/work/"), &[])
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_list_addressbooks() {
    let server = MockServer::start().await;
    let body = [
        ok_response("/card/alice/", "<D:resourcetype><D:collection/></D:resourcetype>"),
        ok_response(
            "/card/alice/contacts/",
            "<D:resourcetype><D:collection/><CARD:addressbook/></D:resourcetype>\
             <D:displayname>Contacts</D:displayname>\
             <CARD:supported-address-data><CARD:address-data-type content-type=\"text/vcard\" version=\"4.0\"/></CARD:supported-address-data>",
        ),
        ok_response("/card/alice/notes/", "<D:resourcetype><D:collection/></D:resourcetype>"),
    ]
    .concat();
    Mock::given(method("PROPFIND"))
        .and(path("/card/alice/"))
        .and(header("depth", "1"))
        .respond_with(multistatus(&body))
        .mount(&server)
        .await;

    let carddav = CardDavClient::with_client(client(None));
    let books = carddav
        .list_addressbooks(&at(&server, "/card/alice/"))
        .await
        .unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title(), "Contacts");
    assert!(books[0].vcard4);
    assert!(!books[0].read_only);
}
