//! XML plumbing: a small namespace-aware element tree for responses and the
//! request body builders.

use quick_xml::NsReader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;

use crate::error::{DavError, Result};
use crate::webdav::names::{self, NAMESPACE_DECLS, PropertyName};
use crate::webdav::types::ServiceType;

/// One parsed element with its resolved namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub namespace: String,
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated character data directly inside this element.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn is(&self, name: &PropertyName) -> bool {
        name.matches(&self.namespace, &self.name)
    }

    pub fn child(&self, name: &PropertyName) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(name))
    }

    pub fn children_named<'a>(
        &'a self,
        name: &'a PropertyName,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.is(name))
    }

    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == local_name)
            .map(|(_, v)| v.as_str())
    }

    /// Text with surrounding whitespace removed; `None` when blank.
    pub fn trimmed_text(&self) -> Option<&str> {
        let t = self.text.trim();
        (!t.is_empty()).then_some(t)
    }
}

/// Parse a whole document into its root element.
pub fn parse_document(body: &[u8]) -> Result<XmlElement> {
    let text = std::str::from_utf8(body)
        .map_err(|e| DavError::protocol(format!("response is not UTF-8: {e}")))?;
    let mut reader = NsReader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::with_capacity(16);
    let mut root = None;

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(e) => {
                stack.push(element_from_start(&ns, &e)?);
            }
            Event::Empty(e) => {
                let el = element_from_start(&ns, &e)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| DavError::protocol("unbalanced end tag"))?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&decode_text(&t)?);
                }
            }
            Event::CData(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::GeneralRef(r) => {
                if let Some(top) = stack.last_mut() {
                    let ch = r
                        .resolve_char_ref()
                        .map_err(|e| DavError::protocol(format!("bad character reference: {e}")))?;
                    if let Some(ch) = ch {
                        top.text.push(ch);
                    } else {
                        let entity = String::from_utf8_lossy(&r).into_owned();
                        let resolved = resolve_predefined_entity(&entity).ok_or_else(|| {
                            DavError::protocol(format!("unknown entity &{entity};"))
                        })?;
                        top.text.push_str(resolved);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DavError::protocol("unexpected end of document"));
    }
    root.ok_or_else(|| DavError::protocol("document has no root element"))
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None if root.is_none() => *root = Some(el),
        None => return Err(DavError::protocol("multiple root elements")),
    }
    Ok(())
}

fn element_from_start(ns: &ResolveResult<'_>, e: &BytesStart<'_>) -> Result<XmlElement> {
    let namespace = match ns {
        ResolveResult::Bound(n) => String::from_utf8_lossy(n.as_ref()).into_owned(),
        _ => String::new(),
    };
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = decode_text(&attr.value)?;
        attributes.push((key, value));
    }

    Ok(XmlElement {
        namespace,
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

pub fn decode_text(raw: &[u8]) -> Result<String> {
    match std::str::from_utf8(raw) {
        Ok(s) => Ok(unescape(s)
            .map_err(|err| DavError::protocol(format!("XML decode error: {err}")))?
            .into_owned()),
        Err(_) => Ok(String::from_utf8_lossy(raw).into_owned()),
    }
}

pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn push_prop_list(body: &mut String, props: &[PropertyName]) {
    body.push_str("<D:prop>");
    for prop in props {
        body.push('<');
        body.push_str(prop.prefix());
        body.push(':');
        body.push_str(prop.name);
        body.push_str("/>");
    }
    body.push_str("</D:prop>");
}

/// `<D:propfind>` asking for exactly `props`.
pub fn build_propfind_body(props: &[PropertyName]) -> String {
    let mut body = format!(r#"<?xml version="1.0" encoding="utf-8"?><D:propfind {NAMESPACE_DECLS}>"#);
    push_prop_list(&mut body, props);
    body.push_str("</D:propfind>");
    body
}

/// `addressbook-multiget` / `calendar-multiget` for the given hrefs, asking
/// for the ETag and the service's data property.
pub fn build_multiget_body<S: AsRef<str>>(service: ServiceType, hrefs: &[S]) -> String {
    let root = match service {
        ServiceType::CardDav => "CARD:addressbook-multiget",
        ServiceType::CalDav => "C:calendar-multiget",
    };
    let mut body = format!(r#"<?xml version="1.0" encoding="utf-8"?><{root} {NAMESPACE_DECLS}>"#);
    push_prop_list(&mut body, &[names::GETETAG, service.data_property()]);
    for href in hrefs {
        body.push_str("<D:href>");
        body.push_str(&escape_xml(href.as_ref()));
        body.push_str("</D:href>");
    }
    body.push_str("</");
    body.push_str(root);
    body.push('>');
    body
}
