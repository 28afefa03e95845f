//! In-memory stand-ins for the pieces a codec talks to.
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future;
use tokio::io::{AsyncRead, ReadBuf};

use crate::body::Source;
use crate::common::timeout::Timeout;
use crate::proto::framed::{FramedConnection, FramedStream, Header};
use crate::proto::{CodecId, StreamAllocation};
use crate::protocol::Protocol;

pub(crate) type Events = Arc<Mutex<Vec<&'static str>>>;

#[derive(Clone, Debug, Default)]
pub(crate) struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn inc(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockAllocation {
    finished: Mutex<Vec<(bool, CodecId)>>,
    events: Events,
}

impl MockAllocation {
    pub(crate) fn new() -> MockAllocation {
        MockAllocation::default()
    }

    pub(crate) fn finished(&self) -> Vec<(bool, CodecId)> {
        self.finished.lock().unwrap().clone()
    }

    pub(crate) fn events(&self) -> Events {
        self.events.clone()
    }
}

impl StreamAllocation for MockAllocation {
    fn stream_finished(&self, no_new_streams: bool, codec: CodecId) {
        self.finished.lock().unwrap().push((no_new_streams, codec));
        self.events.lock().unwrap().push("finished");
    }
}

#[derive(Debug)]
pub(crate) struct MockSource {
    data: Vec<u8>,
    pos: usize,
    closes: Counter,
    events: Option<Events>,
    fail_read: Option<io::ErrorKind>,
    fail_close: Option<io::ErrorKind>,
}

impl MockSource {
    pub(crate) fn new(data: &[u8]) -> MockSource {
        MockSource {
            data: data.to_vec(),
            pos: 0,
            closes: Counter::default(),
            events: None,
            fail_read: None,
            fail_close: None,
        }
    }

    pub(crate) fn closes(&self) -> Counter {
        self.closes.clone()
    }

    pub(crate) fn count_closes_in(mut self, closes: Counter) -> MockSource {
        self.closes = closes;
        self
    }

    pub(crate) fn on_close(mut self, events: Events) -> MockSource {
        self.events = Some(events);
        self
    }

    pub(crate) fn fail_read(mut self, kind: io::ErrorKind) -> MockSource {
        self.fail_read = Some(kind);
        self
    }

    pub(crate) fn fail_close(mut self, kind: io::ErrorKind) -> MockSource {
        self.fail_close = Some(kind);
        self
    }
}

impl AsyncRead for MockSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(kind) = self.fail_read {
            return Poll::Ready(Err(io::Error::new(kind, "mock read failure")));
        }
        let rest = &self.data[self.pos..];
        let n = std::cmp::min(rest.len(), buf.remaining());
        buf.put_slice(&rest[..n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}

impl Source for MockSource {
    fn close(&mut self) -> io::Result<()> {
        self.closes.inc();
        if let Some(ref events) = self.events {
            events.lock().unwrap().push("closed");
        }
        match self.fail_close {
            Some(kind) => Err(io::Error::new(kind, "mock close failure")),
            None => Ok(()),
        }
    }
}

/// Timeouts a stream carried when its response headers were requested.
pub(crate) type SeenTimeouts = Arc<Mutex<Option<(Option<Duration>, Option<Duration>)>>>;

#[derive(Debug)]
pub(crate) struct MockFramedConnection {
    protocol: Protocol,
    http2: bool,
    headers: Vec<Header>,
    body: Vec<u8>,
    fail_new_stream: Option<io::ErrorKind>,
    never_respond: bool,
    new_streams: Mutex<Vec<(Vec<Header>, bool, bool)>>,
    source_closes: Counter,
    stream_drops: Counter,
    seen_timeouts: SeenTimeouts,
}

impl MockFramedConnection {
    pub(crate) fn new(protocol: Protocol) -> MockFramedConnection {
        MockFramedConnection {
            protocol,
            http2: protocol == Protocol::Http2,
            headers: vec![Header::new(":status", "200")],
            body: Vec::new(),
            fail_new_stream: None,
            never_respond: false,
            new_streams: Mutex::new(Vec::new()),
            source_closes: Counter::default(),
            stream_drops: Counter::default(),
            seen_timeouts: SeenTimeouts::default(),
        }
    }

    /// Overrides which translator the connection asks for.
    pub(crate) fn http2_framing(mut self, http2: bool) -> MockFramedConnection {
        self.http2 = http2;
        self
    }

    pub(crate) fn headers(mut self, headers: Vec<Header>) -> MockFramedConnection {
        self.headers = headers;
        self
    }

    pub(crate) fn body(mut self, body: &[u8]) -> MockFramedConnection {
        self.body = body.to_vec();
        self
    }

    pub(crate) fn fail_new_stream(mut self, kind: io::ErrorKind) -> MockFramedConnection {
        self.fail_new_stream = Some(kind);
        self
    }

    pub(crate) fn never_respond(mut self) -> MockFramedConnection {
        self.never_respond = true;
        self
    }

    /// The arguments of every `new_stream` call so far.
    pub(crate) fn new_streams(&self) -> Vec<(Vec<Header>, bool, bool)> {
        self.new_streams.lock().unwrap().clone()
    }

    pub(crate) fn source_closes(&self) -> Counter {
        self.source_closes.clone()
    }

    pub(crate) fn stream_drops(&self) -> Counter {
        self.stream_drops.clone()
    }

    pub(crate) fn seen_timeouts(&self) -> Option<(Option<Duration>, Option<Duration>)> {
        *self.seen_timeouts.lock().unwrap()
    }
}

impl FramedConnection for MockFramedConnection {
    type Stream = MockStream;

    async fn new_stream(
        &self,
        request_headers: Vec<Header>,
        out: bool,
        input: bool,
    ) -> io::Result<MockStream> {
        self.new_streams
            .lock()
            .unwrap()
            .push((request_headers, out, input));
        if let Some(kind) = self.fail_new_stream {
            return Err(io::Error::new(kind, "mock stream refused"));
        }
        Ok(MockStream {
            read_timeout: Timeout::new(),
            write_timeout: Timeout::new(),
            headers: self.headers.clone(),
            never_respond: self.never_respond,
            source: MockSource::new(&self.body).count_closes_in(self.source_closes.clone()),
            drops: self.stream_drops.clone(),
            seen_timeouts: self.seen_timeouts.clone(),
        })
    }

    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn is_http2(&self) -> bool {
        self.http2
    }
}

#[derive(Debug)]
pub(crate) struct MockStream {
    read_timeout: Timeout,
    write_timeout: Timeout,
    headers: Vec<Header>,
    never_respond: bool,
    source: MockSource,
    drops: Counter,
    seen_timeouts: SeenTimeouts,
}

impl FramedStream for MockStream {
    type Source = MockSource;

    fn read_timeout(&mut self) -> &mut Timeout {
        &mut self.read_timeout
    }

    fn write_timeout(&mut self) -> &mut Timeout {
        &mut self.write_timeout
    }

    async fn response_headers(&mut self) -> io::Result<Vec<Header>> {
        *self.seen_timeouts.lock().unwrap() =
            Some((self.read_timeout.duration(), self.write_timeout.duration()));
        if self.never_respond {
            self.read_timeout.run(future::pending::<()>()).await?;
        }
        Ok(self.headers.clone())
    }

    fn source(&mut self) -> &mut MockSource {
        &mut self.source
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.drops.inc();
    }
}
