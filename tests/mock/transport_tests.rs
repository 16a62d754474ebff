use async_compression::tokio::bufread::GzipEncoder;
use bytes::Bytes;
use davsync::{DavError, PropfindPurpose, ServiceType, TransportConfig, WebDavClient};
use hyper::{HeaderMap, Method};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::util::{ALICE_BASIC, alice, at, client, dav_options, multistatus, ok_response, principal_prop};

#[tokio::test]
async fn test_propfind_redirect_is_reissued_as_propfind() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new/path"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/new/path"))
        .and(header("depth", "0"))
        .and(body_string_contains("current-user-principal"))
        .respond_with(multistatus(&ok_response(
            "/new/path",
            &principal_prop("/principals/alice/"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(None)
        .propfind(&at(&server, "/old"), PropfindPurpose::PrincipalLookup)
        .await
        .expect("redirected PROPFIND");
    assert_eq!(result.location, at(&server, "/new/path"));
    let own = result.own.expect("requested resource");
    assert_eq!(own.current_user_principal(), Some("/principals/alice/"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.method.as_str() == "PROPFIND"));
    assert_eq!(requests[0].body, requests[1].body);
    assert_eq!(
        requests[1].headers.get("content-type").unwrap(),
        "text/xml; charset=utf-8"
    );
}

#[tokio::test]
async fn test_redirect_loop_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(path("/loop"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/loop"))
        .mount(&server)
        .await;

    let err = client(None)
        .propfind(&at(&server, "/loop"), PropfindPurpose::CTag)
        .await
        .unwrap_err();
    assert!(matches!(err, DavError::TooManyRedirects(5)), "{err:?}");
    assert_eq!(server.received_requests().await.unwrap().len(), 5);

    let err = client(None).options(&at(&server, "/loop")).await.unwrap_err();
    assert!(matches!(err, DavError::TooManyRedirects(5)), "{err:?}");
}

#[tokio::test]
async fn test_options_follows_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(307).insert_header("location", "/b/"))
        .mount(&server)
        .await;
    Mock::given(method("OPTIONS"))
        .and(path("/b/"))
        .respond_with(dav_options("1, 2, calendar-access"))
        .mount(&server)
        .await;

    let caps = client(None).options(&at(&server, "/a")).await.unwrap();
    assert!(caps.offers(ServiceType::CalDav));
    assert!(!caps.offers(ServiceType::CardDav));
}

#[tokio::test]
async fn test_reactive_auth_retries_once_with_basic() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .and(header("authorization", ALICE_BASIC))
        .respond_with(dav_options("1, addressbook"))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("OPTIONS"))
        .respond_with(
            ResponseTemplate::new(401).insert_header("www-authenticate", r#"Basic realm="dav""#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let supported = client(Some(alice()))
        .supports(&at(&server, "/principals/alice/"), ServiceType::CardDav)
        .await
        .unwrap();
    assert!(supported);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(requests[1].headers.get("authorization").unwrap(), ALICE_BASIC);
}

#[tokio::test]
async fn test_rejected_credentials_are_not_retried_again() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(ResponseTemplate::new(401).insert_header("www-authenticate", "Basic"))
        .mount(&server)
        .await;

    let err = client(Some(alice()))
        .options(&at(&server, "/"))
        .await
        .unwrap_err();
    assert!(matches!(err, DavError::NotAuthorized));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_non_basic_challenge_is_not_answered() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(
            ResponseTemplate::new(401).insert_header("www-authenticate", r#"Bearer realm="x""#),
        )
        .mount(&server)
        .await;

    let err = client(Some(alice()))
        .options(&at(&server, "/"))
        .await
        .unwrap_err();
    assert!(matches!(err, DavError::NotAuthorized));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_preemptive_auth_sends_header_first() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .and(header("authorization", ALICE_BASIC))
        .respond_with(dav_options("1"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(Some(alice().preemptive(true)));
    client.options(&at(&server, "/")).await.unwrap();
    client.options(&at(&server, "/other/")).await.unwrap();
}

#[tokio::test]
async fn test_gzip_bodies_are_decompressed() {
    let plain = "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n".repeat(20);
    let mut compressed = Vec::new();
    GzipEncoder::new(plain.as_bytes())
        .read_to_end(&mut compressed)
        .await
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("accept-encoding", "gzip"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(compressed),
        )
        .mount(&server)
        .await;

    let response = client(None)
        .transport()
        .send(Method::GET, &at(&server, "/e.ics"), HeaderMap::new(), Bytes::new())
        .await
        .unwrap();
    assert_eq!(response.body, Bytes::from(plain));
    assert!(response.headers.get("content-encoding").is_none());
}

#[tokio::test]
async fn test_cookies_are_replayed_to_the_same_url() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(dav_options("1").insert_header("set-cookie", "session=abc; Path=/; HttpOnly"))
        .mount(&server)
        .await;

    let client = client(None);
    let url = at(&server, "/dav/");
    client.options(&url).await.unwrap();
    client.options(&url).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("cookie").is_none());
    assert_eq!(requests[1].headers.get("cookie").unwrap(), "session=abc");
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(dav_options("1").set_delay(Duration::from_secs(4)))
        .mount(&server)
        .await;

    let config = TransportConfig {
        write_timeout_secs: 1,
        ..TransportConfig::default()
    };
    let client = WebDavClient::new(config, None).unwrap();
    let started = Instant::now();
    let err = client.options(&at(&server, "/")).await.unwrap_err();
    assert!(matches!(err, DavError::Timeout), "{err:?}");
    assert!(err.is_transport());
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_credentials_stay_with_the_original_origin() {
    let home = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/dav/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/moved/", elsewhere.uri())),
        )
        .mount(&home)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/moved/"))
        .respond_with(multistatus(&ok_response("/moved/", "<D:getctag>1</D:getctag>")))
        .mount(&elsewhere)
        .await;

    let result = client(Some(alice().preemptive(true)))
        .propfind(&at(&home, "/dav/"), PropfindPurpose::CTag)
        .await
        .unwrap();
    assert_eq!(result.location, at(&elsewhere, "/moved/"));

    let sent_home = home.received_requests().await.unwrap();
    assert_eq!(sent_home[0].headers.get("authorization").unwrap(), ALICE_BASIC);
    let sent_elsewhere = elsewhere.received_requests().await.unwrap();
    assert_eq!(sent_elsewhere.len(), 1);
    assert!(sent_elsewhere[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_foreign_challenge_after_redirect_is_not_answered() {
    let home = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/dav/", elsewhere.uri())),
        )
        .mount(&home)
        .await;
    Mock::given(method("OPTIONS"))
        .respond_with(ResponseTemplate::new(401).insert_header("www-authenticate", "Basic"))
        .mount(&elsewhere)
        .await;

    let err = client(Some(alice()))
        .options(&at(&home, "/"))
        .await
        .unwrap_err();
    assert!(matches!(err, DavError::NotAuthorized), "{err:?}");
    let sent_elsewhere = elsewhere.received_requests().await.unwrap();
    assert_eq!(sent_elsewhere.len(), 1);
    assert!(sent_elsewhere[0].headers.get("authorization").is_none());
}
