use std::fmt;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use super::framed::{read_http2_headers, read_spdy3_headers, FramedConnection, FramedStream};
use super::h1::Http1Codec;
use super::HttpCodec;
use crate::body::{ResponseBody, StreamFinishingSource};
use crate::error::Error;
use crate::response::{Response, ResponseBuilder};

/// A codec whose connection may be upgraded to a framed protocol in flight.
///
/// Until [`set_framed_connection`](Http2cCodec::set_framed_connection) is
/// called, every operation goes to the wrapped [`Http1Codec`]. Afterwards
/// the response is read from a single new stream on the framed connection,
/// and closing its body reports the stream finished to the plain codec's
/// allocation.
///
/// Requests are always written by the plain codec.
pub struct Http2cCodec<T, C: FramedConnection> {
    plain: Http1Codec<T>,
    framed: Option<C>,
    stream: Option<C::Stream>,
    headers_read: bool,
    body_opened: bool,
}

impl<T, C> Http2cCodec<T, C>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
    C: FramedConnection,
{
    /// Wraps a plain codec. No framed connection is set yet.
    pub fn new(plain: Http1Codec<T>) -> Http2cCodec<T, C> {
        Http2cCodec {
            plain,
            framed: None,
            stream: None,
            headers_read: false,
            body_opened: false,
        }
    }

    /// Binds the codec to the framed connection the exchange was upgraded to.
    ///
    /// This may be called once, and only before response headers are read.
    pub fn set_framed_connection(&mut self, connection: C) -> crate::Result<()> {
        if self.framed.is_some() {
            return Err(Error::new_user_duplicate_upgrade());
        }
        if self.headers_read {
            return Err(Error::new_user_late_upgrade());
        }
        debug!("upgraded to framed connection; protocol={}", connection.protocol());
        self.framed = Some(connection);
        Ok(())
    }

    /// Returns true once a framed connection was set.
    pub fn is_upgraded(&self) -> bool {
        self.framed.is_some()
    }

    /// The framed connection, if one was set.
    pub fn framed_connection(&self) -> Option<&C> {
        self.framed.as_ref()
    }

    /// The plain codec this one falls back to.
    pub fn plain(&self) -> &Http1Codec<T> {
        &self.plain
    }
}

impl<T, C> HttpCodec for Http2cCodec<T, C>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
    C: FramedConnection,
{
    async fn write_request(&mut self, request: &http::Request<Bytes>) -> crate::Result<()> {
        self.plain.write_request(request).await
    }

    async fn read_response_headers(&mut self) -> crate::Result<ResponseBuilder> {
        let framed = match self.framed {
            Some(ref framed) => framed,
            None => {
                self.headers_read = true;
                return self.plain.read_response_headers().await;
            }
        };
        if self.headers_read {
            return Err(Error::new_user_duplicate_header_read());
        }
        self.headers_read = true;

        let mut stream = framed
            .new_stream(Vec::new(), false, true)
            .await
            .map_err(Error::new_io)?;
        let config = self.plain.config();
        stream.read_timeout().set(config.get_read_timeout());
        stream.write_timeout().set(config.get_write_timeout());

        let headers = stream.response_headers().await.map_err(Error::new_io)?;
        trace!("framed response headers: {:?}", headers);
        let builder = if framed.is_http2() {
            read_http2_headers(&headers)?
        } else {
            read_spdy3_headers(&headers)?
        };

        self.stream = Some(stream);
        Ok(builder.protocol(framed.protocol()))
    }

    fn open_response_body(&mut self, response: &Response) -> crate::Result<ResponseBody<'_>> {
        let stream = match (&self.framed, &mut self.stream) {
            (Some(_), Some(stream)) => stream,
            _ => return self.plain.open_response_body(response),
        };
        if self.body_opened {
            return Err(Error::new_user_unexpected_state(&"response body already opened"));
        }
        self.body_opened = true;

        let source =
            StreamFinishingSource::new(stream.source(), self.plain.allocation(), self.plain.id());
        Ok(ResponseBody::new(response.headers().clone(), source))
    }
}

impl<T, C: FramedConnection> fmt::Debug for Http2cCodec<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Http2cCodec")
            .field("plain", &self.plain)
            .field("upgraded", &self.framed.is_some())
            .field("stream", &self.stream.is_some())
            .finish()
    }
}
