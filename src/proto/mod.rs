//! Pieces pertaining to the HTTP message protocol.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::body::ResponseBody;
use crate::response::{Response, ResponseBuilder};

pub(crate) mod framed;
pub(crate) mod h1;
pub(crate) mod upgrade;

/// Encodes requests and decodes responses for one HTTP exchange at a time.
///
/// Implemented by the plain [`Http1Codec`](crate::Http1Codec) and by the
/// upgrade-aware [`Http2cCodec`](crate::Http2cCodec), which falls back to
/// an `Http1Codec` it owns.
pub trait HttpCodec {
    /// Writes the request head and body, and flushes them to the peer.
    async fn write_request(&mut self, request: &http::Request<Bytes>) -> crate::Result<()>;

    /// Reads the response head, waiting at most the configured read timeout.
    async fn read_response_headers(&mut self) -> crate::Result<ResponseBuilder>;

    /// Opens the body of `response`, whose head was returned by
    /// [`read_response_headers`](HttpCodec::read_response_headers).
    fn open_response_body(&mut self, response: &Response) -> crate::Result<ResponseBody<'_>>;
}

/// Tracks which streams are in use, and learns when one is released.
///
/// A connection pool implements this. Codecs call it once per exchange,
/// when the response body reaches its end or is closed.
pub trait StreamAllocation: Send + Sync {
    /// Reports that the stream used by `codec` is done.
    ///
    /// `no_new_streams` is true when the underlying connection must not
    /// carry another exchange, for example because a body was abandoned
    /// half-read.
    fn stream_finished(&self, no_new_streams: bool, codec: CodecId);
}

/// Identifies the codec that owned a stream.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodecId(u64);

impl CodecId {
    pub(crate) fn next() -> CodecId {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        CodecId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodecId({})", self.0)
    }
}
