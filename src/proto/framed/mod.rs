//! The multiplexed connection an exchange may be upgraded to.
//!
//! Frames, header compression and flow control live behind these traits.
//! The codec only opens a stream, sets its timeouts, reads its response
//! header list and then its data.
use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::Bytes;

use crate::body::Source;
use crate::common::timeout::Timeout;
use crate::protocol::Protocol;

pub use self::convert::{read_http2_headers, read_spdy3_headers};

mod convert;

/// A header as it appears on a framed stream, pseudo-headers included.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Header {
    /// The lowercase header name, such as `:status` or `content-type`.
    pub name: Bytes,
    /// The raw value. SPDY/3 may pack several values separated by NUL.
    pub value: Bytes,
}

impl Header {
    /// Creates a header from a name and value.
    pub fn new<N, V>(name: N, value: V) -> Header
    where
        N: Into<Bytes>,
        V: Into<Bytes>,
    {
        Header {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            String::from_utf8_lossy(&self.name),
            String::from_utf8_lossy(&self.value)
        )
    }
}

/// A connection carrying many logical streams.
pub trait FramedConnection {
    /// A logical stream opened on this connection.
    type Stream: FramedStream;

    /// Opens a new logical stream.
    ///
    /// `out` asks for a stream the caller can send data on, `input` for one
    /// it can receive a response on.
    async fn new_stream(
        &self,
        request_headers: Vec<Header>,
        out: bool,
        input: bool,
    ) -> io::Result<Self::Stream>;

    /// The protocol negotiated for this connection.
    fn protocol(&self) -> Protocol;

    /// Returns true if the connection speaks HTTP/2 rather than SPDY/3.
    fn is_http2(&self) -> bool {
        self.protocol() == Protocol::Http2
    }
}

/// One logical stream on a [`FramedConnection`].
pub trait FramedStream {
    /// The data received on this stream.
    type Source: Source;

    /// The timeout applied while waiting for the peer to send.
    fn read_timeout(&mut self) -> &mut Timeout;

    /// The timeout applied while waiting for the peer to accept data.
    fn write_timeout(&mut self) -> &mut Timeout;

    /// Waits for the response header list, bounded by the read timeout.
    async fn response_headers(&mut self) -> io::Result<Vec<Header>>;

    /// The response data.
    fn source(&mut self) -> &mut Self::Source;
}

impl<C: FramedConnection + ?Sized> FramedConnection for Arc<C> {
    type Stream = C::Stream;

    async fn new_stream(
        &self,
        request_headers: Vec<Header>,
        out: bool,
        input: bool,
    ) -> io::Result<Self::Stream> {
        (**self).new_stream(request_headers, out, input).await
    }

    fn protocol(&self) -> Protocol {
        (**self).protocol()
    }

    fn is_http2(&self) -> bool {
        (**self).is_http2()
    }
}
