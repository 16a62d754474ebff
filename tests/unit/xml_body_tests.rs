use davsync::webdav::names;
use davsync::webdav::xml::{build_multiget_body, build_propfind_body, escape_xml, parse_document};
use davsync::{PropfindPurpose, ServiceType};

#[test]
fn test_escape_xml() {
    assert_eq!(escape_xml(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&apos;");
    assert_eq!(escape_xml("plain"), "plain");
}

#[test]
fn test_propfind_body_is_namespaced() {
    let body = build_propfind_body(&PropfindPurpose::HomeSetLookup.properties());
    let root = parse_document(body.as_bytes()).unwrap();
    assert_eq!(root.namespace, names::DAV);
    assert_eq!(root.name, "propfind");

    let prop = &root.children[0];
    assert_eq!(prop.name, "prop");
    assert!(prop.children.iter().any(|c| c.namespace == names::CALDAV && c.name == "calendar-home-set"));
    assert!(prop.children.iter().any(|c| c.namespace == names::CARDDAV && c.name == "addressbook-home-set"));
}

#[test]
fn test_multiget_body_lists_hrefs() {
    let body = build_multiget_body(ServiceType::CardDav, &["/book/a b.vcf", "/book/x&y.vcf"]);
    let root = parse_document(body.as_bytes()).unwrap();
    assert_eq!(root.namespace, names::CARDDAV);
    assert_eq!(root.name, "addressbook-multiget");

    let hrefs: Vec<&str> = root
        .children
        .iter()
        .filter(|c| c.name == "href")
        .map(|c| c.text.as_str())
        .collect();
    assert_eq!(hrefs, ["/book/a b.vcf", "/book/x&y.vcf"]);

    let cal = build_multiget_body(ServiceType::CalDav, &["/cal/e.ics"]);
    assert!(cal.contains("calendar-multiget"));
    assert!(cal.contains("calendar-data"));
}
