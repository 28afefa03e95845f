use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::HeaderMap;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, BufReader, ReadBuf};

use super::Source;
use crate::error::Error;
use crate::headers;

/// The body of a response, as handed out by a codec.
///
/// `ResponseBody` buffers the underlying [`Source`] and can be read with
/// `tokio::io::AsyncReadExt`/`AsyncBufReadExt`, or all at once with
/// [`bytes`](ResponseBody::bytes) and [`text`](ResponseBody::text).
///
/// The source is closed exactly once: by the first call to
/// [`close`](ResponseBody::close), or when the body is dropped. Closing
/// before the end of the body abandons the rest of it.
pub struct ResponseBody<'a> {
    headers: HeaderMap,
    source: BufReader<Box<dyn Source + 'a>>,
    closed: bool,
}

impl<'a> ResponseBody<'a> {
    pub(crate) fn new<S>(headers: HeaderMap, source: S) -> ResponseBody<'a>
    where
        S: Source + 'a,
    {
        ResponseBody {
            headers,
            source: BufReader::new(Box::new(source)),
            closed: false,
        }
    }

    /// The headers of the response this body belongs to.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The length announced by `Content-Length`, if it is present and valid.
    pub fn content_length(&self) -> Option<u64> {
        headers::content_length_parse_all(&self.headers)
    }

    /// The `Content-Type` header value, if any.
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.headers.get(CONTENT_TYPE)
    }

    /// Returns true once the body has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes the body, releasing the stream it reads from.
    ///
    /// Only the first call closes the underlying source; later calls do
    /// nothing and return `Ok`.
    pub fn close(&mut self) -> crate::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        trace!("closing response body");
        self.source.get_mut().close().map_err(Error::new_io)
    }

    /// Reads the rest of the body into memory, then closes it.
    pub async fn bytes(mut self) -> crate::Result<Bytes> {
        let mut buf = match self.content_length() {
            Some(len) if len <= 1024 * 1024 => Vec::with_capacity(len as usize),
            _ => Vec::new(),
        };
        let read = self.read_to_end(&mut buf).await;
        // close even if the read failed, so the stream is released
        let closed = self.close();
        read.map_err(Error::new_io)?;
        closed?;
        Ok(Bytes::from(buf))
    }

    /// Reads the rest of the body as text, then closes it.
    ///
    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    pub async fn text(self) -> crate::Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl AsyncRead for ResponseBody<'_> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.closed {
            return Poll::Ready(Err(closed()));
        }
        Pin::new(&mut self.source).poll_read(cx, buf)
    }
}

impl AsyncBufRead for ResponseBody<'_> {
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        let me = self.get_mut();
        if me.closed {
            return Poll::Ready(Err(closed()));
        }
        Pin::new(&mut me.source).poll_fill_buf(cx)
    }

    fn consume(mut self: Pin<&mut Self>, amt: usize) {
        Pin::new(&mut self.source).consume(amt)
    }
}

impl Drop for ResponseBody<'_> {
    fn drop(&mut self) {
        if let Err(_err) = self.close() {
            warn!("error closing dropped response body: {}", _err);
        }
    }
}

impl fmt::Debug for ResponseBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("headers", &self.headers)
            .field("closed", &self.closed)
            .finish()
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "response body closed")
}

#[cfg(test)]
mod tests {
    use http::header::CONTENT_LENGTH;
    use tokio::io::AsyncBufReadExt;

    use super::*;
    use crate::mock::MockSource;

    fn headers(content_length: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        if let Some(len) = content_length {
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static(len));
        }
        headers
    }

    #[tokio::test]
    async fn bytes_reads_everything_and_closes() {
        let source = MockSource::new(&b"hello"[..]);
        let closes = source.closes();
        let body = ResponseBody::new(headers(Some("5")), source);
        assert_eq!(body.content_length(), Some(5));
        assert_eq!(body.content_type().unwrap(), "text/plain");

        let bytes = body.bytes().await.unwrap();
        assert_eq!(bytes, "hello");
        assert_eq!(closes.get(), 1);
    }

    #[tokio::test]
    async fn text_decodes_lossy() {
        let source = MockSource::new(&b"caf\xc3\xa9 \xff"[..]);
        let body = ResponseBody::new(headers(None), source);
        assert_eq!(body.text().await.unwrap(), "caf\u{e9} \u{fffd}");
    }

    #[test]
    fn close_twice_closes_source_once() {
        let source = MockSource::new(&b"hello"[..]);
        let closes = source.closes();
        let mut body = ResponseBody::new(headers(None), source);

        body.close().unwrap();
        body.close().unwrap();
        assert!(body.is_closed());
        drop(body);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn drop_closes_unread_body() {
        let source = MockSource::new(&b"never read"[..]);
        let closes = source.closes();
        drop(ResponseBody::new(headers(None), source));
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn drop_swallows_close_error() {
        let _ = pretty_env_logger::try_init();
        let source = MockSource::new(&b"never read"[..]).fail_close(io::ErrorKind::BrokenPipe);
        let closes = source.closes();
        drop(ResponseBody::new(headers(None), source));
        assert_eq!(closes.get(), 1);
    }

    #[tokio::test]
    async fn read_after_close_fails() {
        let mut body = ResponseBody::new(headers(None), MockSource::new(&b"abc"[..]));
        body.close().unwrap();
        let mut buf = [0u8; 3];
        let err = body.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[tokio::test]
    async fn read_lines() {
        let source = MockSource::new(&b"one\ntwo\n"[..]);
        let mut body = ResponseBody::new(headers(None), source);
        let mut line = String::new();
        body.read_line(&mut line).await.unwrap();
        assert_eq!(line, "one\n");
    }

    #[tokio::test]
    async fn read_error_still_closes() {
        let source = MockSource::new(&b""[..]).fail_read(io::ErrorKind::ConnectionReset);
        let closes = source.closes();
        let body = ResponseBody::new(headers(None), source);

        let err = body.bytes().await.unwrap_err();
        assert!(err.is_io());
        assert_eq!(closes.get(), 1);
    }
}
