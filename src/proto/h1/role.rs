use bytes::{BufMut, BytesMut};
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, Method, StatusCode};

use super::Decoder;
use crate::error::{Error, Parse};
use crate::headers;
use crate::protocol::Protocol;
use crate::response::{Response, ResponseBuilder};

const MAX_HEADERS: usize = 100;
const AVERAGE_HEADER_SIZE: usize = 30; // totally scientific

/// Parses a response head from the front of `buf`.
///
/// Returns `Ok(None)` if more bytes are needed. On success the head is
/// split off `buf`, leaving any body bytes behind.
pub(crate) fn parse_response(buf: &mut BytesMut) -> crate::Result<Option<ResponseBuilder>> {
    if buf.is_empty() {
        return Ok(None);
    }

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    trace!("Response.parse([Header; {}], [u8; {}])", headers.len(), buf.len());
    let mut res = httparse::Response::new(&mut headers);
    let len = match res.parse(&buf[..]).map_err(Parse::from)? {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => return Ok(None),
    };
    trace!("Response.parse Complete({})", len);

    let code = res.code.ok_or_else(Error::new_status)?;
    let status = StatusCode::from_u16(code).map_err(Parse::from)?;
    let protocol = if res.version == Some(1) {
        Protocol::Http11
    } else {
        Protocol::Http10
    };

    let mut map = HeaderMap::with_capacity(res.headers.len());
    for header in res.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(Parse::from)?;
        let value = HeaderValue::from_bytes(header.value).map_err(Parse::from)?;
        map.append(name, value);
    }

    let builder = ResponseBuilder::new()
        .protocol(protocol)
        .status(status)
        .message(res.reason.unwrap_or(""))
        .headers(map);

    let _ = buf.split_to(len);
    Ok(Some(builder))
}

/// Picks how the body of `res` is framed.
///
/// `method` is the method of the request this response answers.
pub(crate) fn decoder(res: &Response, method: Option<&Method>) -> crate::Result<Decoder> {
    // According to https://tools.ietf.org/html/rfc7230#section-3.3.3
    // 1. HEAD responses, and Status 1xx, 204, and 304 cannot have a body.
    // 2. Status 2xx to a CONNECT cannot have a body.
    // 3. Transfer-Encoding: chunked has a chunked body.
    // 4. If multiple differing Content-Length headers or invalid, close connection.
    // 5. Content-Length header has a sized body.
    // 6. (irrelevant to Response)
    // 7. Read till EOF.

    match res.status().as_u16() {
        100..=199 | 204 | 304 => return Ok(Decoder::length(0)),
        _ => (),
    }
    match method {
        Some(&Method::HEAD) => {
            return Ok(Decoder::length(0));
        }
        Some(&Method::CONNECT) if res.status().is_success() => {
            return Ok(Decoder::length(0));
        }
        Some(_) => {}
        None => {
            trace!("decoder is missing the Method");
        }
    }

    let headers = res.headers();
    if headers.contains_key(TRANSFER_ENCODING) {
        // https://tools.ietf.org/html/rfc7230#section-3.3.3
        // If Transfer-Encoding header is present, and 'chunked' is
        // not the final encoding, and this is a Response, then the
        // body is read until the connection closes.
        if res.protocol() == Protocol::Http10 {
            debug!("HTTP/1.0 cannot have Transfer-Encoding header");
            Err(Error::new_header())
        } else if headers::transfer_encoding_is_chunked(headers) {
            Ok(Decoder::chunked())
        } else {
            trace!("not chunked, read till eof");
            Ok(Decoder::eof())
        }
    } else if let Some(len) = headers::content_length_parse_all(headers) {
        Ok(Decoder::length(len))
    } else if headers.contains_key(CONTENT_LENGTH) {
        debug!("illegal Content-Length header");
        Err(Error::new_header())
    } else {
        trace!("neither Transfer-Encoding nor Content-Length");
        Ok(Decoder::eof())
    }
}

/// Encodes a request line, headers and body into `dst`.
pub(crate) fn encode_request(req: &http::Request<bytes::Bytes>, dst: &mut Vec<u8>) {
    let mut headers = req.headers().clone();
    headers::set_host_if_missing(&mut headers, req.uri());
    if !req.body().is_empty() {
        headers::set_content_length_if_missing(&mut headers, req.body().len() as u64);
    }

    let init_cap = 30 + headers.len() * AVERAGE_HEADER_SIZE + req.body().len();
    dst.reserve(init_cap);

    extend(dst, req.method().as_str().as_bytes());
    extend(dst, b" ");
    let path = req
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    extend(dst, path.as_bytes());
    extend(dst, b" HTTP/1.1\r\n");

    for (name, value) in headers.iter() {
        extend(dst, name.as_str().as_bytes());
        extend(dst, b": ");
        extend(dst, value.as_bytes());
        extend(dst, b"\r\n");
    }
    extend(dst, b"\r\n");
    extend(dst, req.body());
}

#[inline]
fn extend(dst: &mut Vec<u8>, data: &[u8]) {
    dst.put_slice(data);
}
