use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use super::Source;
use crate::proto::{CodecId, StreamAllocation};

/// Wraps a framed stream's byte source so that closing it reports the
/// stream as finished.
///
/// Reads pass straight through. On `close`, the allocation (if any) is
/// told the stream finished, then the delegate is closed, in that order and
/// on every call. Callers that need a single notification close through
/// [`ResponseBody`](super::ResponseBody), which guards against a second close.
pub(crate) struct StreamFinishingSource<S> {
    delegate: S,
    allocation: Option<Arc<dyn StreamAllocation>>,
    owner: CodecId,
}

impl<S: Source> StreamFinishingSource<S> {
    pub(crate) fn new(
        delegate: S,
        allocation: Option<Arc<dyn StreamAllocation>>,
        owner: CodecId,
    ) -> StreamFinishingSource<S> {
        StreamFinishingSource {
            delegate,
            allocation,
            owner,
        }
    }
}

impl<S: Source> AsyncRead for StreamFinishingSource<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.delegate).poll_read(cx, buf)
    }
}

impl<S: Source> Source for StreamFinishingSource<S> {
    fn close(&mut self) -> io::Result<()> {
        if let Some(ref allocation) = self.allocation {
            trace!("stream finished; codec={:?}", self.owner);
            // framed streams are never handed to another exchange
            allocation.stream_finished(false, self.owner);
        }
        self.delegate.close()
    }
}

impl<S> fmt::Debug for StreamFinishingSource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamFinishingSource")
            .field("owner", &self.owner)
            .field("allocation", &self.allocation.is_some())
            .finish()
    }
}
