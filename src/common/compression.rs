//! Transparent gzip support for response bodies.

use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use http_body_util::BodyStream;
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::HeaderMap;
use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncReadExt, BufReader};
use tokio_util::io::StreamReader;

use crate::error::Result;

/// Content codings understood when reading responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
}

impl ContentEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
        }
    }
}

/// Parse the response `Content-Encoding` chain, outermost first.
///
/// Identity entries are dropped. `None` means the body uses a coding this
/// client never asked for and cannot decode.
pub fn detect_encodings(headers: &HeaderMap) -> Option<Vec<ContentEncoding>> {
    let Some(val) = headers.get(header::CONTENT_ENCODING) else {
        return Some(Vec::new());
    };
    let raw = val.to_str().ok()?;

    let mut chain = Vec::new();
    for token in raw.split(',') {
        match token.trim().to_ascii_lowercase().as_str() {
            "" | "identity" => {}
            "gzip" | "x-gzip" => chain.push(ContentEncoding::Gzip),
            _ => return None,
        }
    }
    Some(chain)
}

/// Insert `Accept-Encoding: gzip` unless the caller already chose something.
pub fn add_accept_encoding(h: &mut HeaderMap) {
    if !h.contains_key(header::ACCEPT_ENCODING) {
        h.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
    }
}

/// Read a whole response body, undoing the listed content codings.
pub async fn decompress_body(body: Incoming, encodings: &[ContentEncoding]) -> Result<Bytes> {
    let stream = BodyStream::new(body)
        .map_ok(|frame| frame.into_data().unwrap_or_default())
        .map_err(std::io::Error::other);
    let mut current: Box<dyn AsyncBufRead + Unpin + Send> =
        Box::new(BufReader::new(StreamReader::new(stream)));

    for encoding in encodings.iter().rev() {
        current = match encoding {
            ContentEncoding::Identity => current,
            ContentEncoding::Gzip => Box::new(BufReader::new(GzipDecoder::new(current))),
        };
    }

    let mut out = Vec::with_capacity(16 * 1024);
    current.read_to_end(&mut out).await?;
    Ok(Bytes::from(out))
}

/// After decompression the original length and coding headers are stale.
pub(crate) fn strip_encoding_headers(headers: &mut HeaderMap, body_len: usize) {
    headers.remove(header::CONTENT_ENCODING);
    if let Ok(value) = HeaderValue::from_str(&body_len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    } else {
        headers.remove(header::CONTENT_LENGTH);
    }
}
