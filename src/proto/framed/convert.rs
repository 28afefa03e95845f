use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;

use super::Header;
use crate::error::{Error, Parse};
use crate::protocol::Protocol;
use crate::response::{ResponseBuilder, StatusLine};

const STATUS: &[u8] = b":status";
const VERSION: &[u8] = b":version";

/// Connection-specific headers that must not appear on an HTTP/2 response.
const HTTP2_SKIPPED: &[&[u8]] = &[
    b"connection",
    b"host",
    b"keep-alive",
    b"proxy-connection",
    b"te",
    b"transfer-encoding",
    b"encoding",
    b"upgrade",
];

/// Connection-specific headers that must not appear on a SPDY/3 response.
const SPDY3_SKIPPED: &[&[u8]] = &[
    b"connection",
    b"host",
    b"keep-alive",
    b"proxy-connection",
    b"transfer-encoding",
];

/// Translates an HTTP/2 response header list.
///
/// The status comes from `:status`; other pseudo-headers and
/// connection-specific headers are dropped. The builder is tagged
/// [`Protocol::Http2`].
pub fn read_http2_headers(headers: &[Header]) -> crate::Result<ResponseBuilder> {
    let mut status = None;
    let mut map = HeaderMap::with_capacity(headers.len());
    for header in headers {
        let name = &header.name[..];
        if name == STATUS {
            status = Some(utf8(&header.value)?);
        } else if is_dropped(name, HTTP2_SKIPPED) {
            trace!("dropping header {:?}", header);
        } else {
            append(&mut map, name, &header.value)?;
        }
    }

    let status = status.ok_or_else(|| Error::new_pseudo_header(":status"))?;
    let line = StatusLine::parse(&format!("HTTP/1.1 {}", status))?;
    Ok(ResponseBuilder::new()
        .status_line(line)?
        .protocol(Protocol::Http2)
        .headers(map))
}

/// Translates a SPDY/3 response header list.
///
/// A value may carry several NUL-separated values. `:status` and
/// `:version` (`HTTP/1.1` when absent) form the status line. The builder
/// is tagged [`Protocol::Spdy3`].
pub fn read_spdy3_headers(headers: &[Header]) -> crate::Result<ResponseBuilder> {
    let mut status = None;
    let mut version = "HTTP/1.1";
    let mut map = HeaderMap::with_capacity(headers.len());
    for header in headers {
        let name = &header.name[..];
        for value in header.value.split(|&b| b == 0) {
            if name == STATUS {
                status = Some(utf8(value)?);
            } else if name == VERSION {
                version = utf8(value)?;
            } else if is_dropped(name, SPDY3_SKIPPED) {
                trace!("dropping header {:?}", header);
            } else {
                append(&mut map, name, value)?;
            }
        }
    }

    let status = status.ok_or_else(|| Error::new_pseudo_header(":status"))?;
    let line = StatusLine::parse(&format!("{} {}", version, status))?;
    Ok(ResponseBuilder::new()
        .status_line(line)?
        .protocol(Protocol::Spdy3)
        .headers(map))
}

fn append(map: &mut HeaderMap, name: &[u8], value: &[u8]) -> crate::Result<()> {
    let name = HeaderName::from_bytes(name).map_err(Parse::from)?;
    let value = HeaderValue::from_bytes(value).map_err(Parse::from)?;
    map.append(name, value);
    Ok(())
}

fn is_dropped(name: &[u8], skipped: &[&[u8]]) -> bool {
    name.starts_with(b":") || skipped.iter().any(|&skip| skip == name)
}

fn utf8(value: &[u8]) -> crate::Result<&str> {
    std::str::from_utf8(value).map_err(|_| Error::new_status())
}
