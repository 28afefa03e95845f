use std::cmp;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{Method, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::{role, Buffered, Decoder};
use crate::body::{ResponseBody, Source};
use crate::common::timeout::Timeout;
use crate::config::Config;
use crate::error::Error;
use crate::headers;
use crate::proto::{CodecId, HttpCodec, StreamAllocation};
use crate::protocol::Protocol;
use crate::response::{Response, ResponseBuilder};

/// An HTTP/1.1 codec over a single plain connection.
///
/// One exchange runs at a time: write a request, read the response head,
/// open and read the body. When the body ends cleanly on a reusable
/// connection, the codec is ready for the next request.
pub struct Http1Codec<T> {
    id: CodecId,
    io: Buffered<T>,
    config: Config,
    allocation: Option<Arc<dyn StreamAllocation>>,
    state: State,
    method: Option<Method>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    ReadResponseHeaders,
    OpenResponseBody,
    ReadingResponseBody,
    Closed,
}

impl<T> Http1Codec<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Creates a codec over an already connected transport.
    pub fn new(io: T, config: Config) -> Http1Codec<T> {
        let mut io = Buffered::new(io);
        io.set_max_buf_size(config.get_max_header_size());
        Http1Codec {
            id: CodecId::next(),
            io,
            config,
            allocation: None,
            state: State::Idle,
            method: None,
        }
    }

    /// Sets the allocation told when each response body is done with.
    pub fn with_allocation(mut self, allocation: Arc<dyn StreamAllocation>) -> Http1Codec<T> {
        self.allocation = Some(allocation);
        self
    }

    /// The identity this codec reports to its allocation.
    pub fn id(&self) -> CodecId {
        self.id
    }

    /// The settings this codec was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns true once the connection can no longer carry an exchange.
    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    pub(crate) fn allocation(&self) -> Option<Arc<dyn StreamAllocation>> {
        self.allocation.clone()
    }

    fn expect_state(&self, expected: State) -> crate::Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            debug!("expected state {:?}, found {:?}", expected, self.state);
            Err(Error::new_user_unexpected_state(&self.state))
        }
    }
}

impl<T> HttpCodec for Http1Codec<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_request(&mut self, request: &http::Request<Bytes>) -> crate::Result<()> {
        self.expect_state(State::Idle)?;

        let mut buf = Vec::new();
        role::encode_request(request, &mut buf);
        trace!("encoded request: {} {}", request.method(), request.uri());

        let mut timeout = Timeout::new();
        timeout.set(self.config.get_write_timeout());
        let written = timeout
            .run(self.io.write_and_flush(&buf))
            .await
            .and_then(|res| res);
        if let Err(err) = written {
            self.state = State::Closed;
            return Err(Error::new_io(err));
        }

        self.method = Some(request.method().clone());
        self.state = State::ReadResponseHeaders;
        Ok(())
    }

    async fn read_response_headers(&mut self) -> crate::Result<ResponseBuilder> {
        self.expect_state(State::ReadResponseHeaders)?;

        let mut timeout = Timeout::new();
        timeout.set(self.config.get_read_timeout());
        loop {
            let head = match timeout.run(self.io.read_response_head()).await {
                Ok(Ok(head)) => head,
                Ok(Err(err)) => {
                    self.state = State::Closed;
                    return Err(err);
                }
                Err(err) => {
                    self.state = State::Closed;
                    return Err(Error::new_io(err));
                }
            };

            match head.status_ref() {
                Some(status) if status.is_informational() && status.as_u16() != 101 => {
                    trace!("ignoring informational response: {}", status);
                    continue;
                }
                _ => {
                    self.state = State::OpenResponseBody;
                    return Ok(head);
                }
            }
        }
    }

    fn open_response_body(&mut self, response: &Response) -> crate::Result<ResponseBody<'_>> {
        self.expect_state(State::OpenResponseBody)?;

        let decoder = match role::decoder(response, self.method.as_ref()) {
            Ok(decoder) => decoder,
            Err(err) => {
                self.state = State::Closed;
                return Err(err);
            }
        };
        debug!("response body decoder: {:?}", decoder);

        // after a 101 the socket speaks whatever protocol was switched to
        let keep_alive = response.status() != StatusCode::SWITCHING_PROTOCOLS
            && response.protocol() == Protocol::Http11
            && !headers::connection_close(response.headers());
        let mut read_timeout = Timeout::new();
        read_timeout.set(self.config.get_read_timeout());

        self.state = State::ReadingResponseBody;
        let mut source = Http1BodySource {
            io: &mut self.io,
            state: &mut self.state,
            decoder,
            leftover: Bytes::new(),
            read_timeout,
            allocation: self.allocation.clone(),
            owner: self.id,
            keep_alive,
            finished: false,
        };
        if source.decoder.is_eof() {
            source.end_of_input();
        }
        Ok(ResponseBody::new(response.headers().clone(), source))
    }
}

impl<T> fmt::Debug for Http1Codec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Http1Codec")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("io", &self.io)
            .finish()
    }
}

/// Reads one response body off the codec's connection.
struct Http1BodySource<'a, T> {
    io: &'a mut Buffered<T>,
    state: &'a mut State,
    decoder: Decoder,
    leftover: Bytes,
    read_timeout: Timeout,
    allocation: Option<Arc<dyn StreamAllocation>>,
    owner: CodecId,
    keep_alive: bool,
    finished: bool,
}

impl<T> Http1BodySource<'_, T> {
    /// The body was read to its end.
    fn end_of_input(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let reuse = self.keep_alive && !self.decoder.is_close_delimited();
        *self.state = if reuse { State::Idle } else { State::Closed };
        trace!("response body complete; reuse={}", reuse);
        if let Some(ref allocation) = self.allocation {
            allocation.stream_finished(!reuse, self.owner);
        }
    }

    /// The body can't be read to its end; the connection is unusable.
    fn abandon(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        *self.state = State::Closed;
        if let Some(ref allocation) = self.allocation {
            allocation.stream_finished(true, self.owner);
        }
    }
}

impl<T> AsyncRead for Http1BodySource<'_, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if me.leftover.is_empty() {
            if me.finished {
                return Poll::Ready(Ok(()));
            }
            match me.decoder.decode(cx, &mut *me.io) {
                Poll::Ready(Ok(chunk)) => {
                    me.read_timeout.reset();
                    if chunk.is_empty() {
                        me.end_of_input();
                        return Poll::Ready(Ok(()));
                    }
                    me.leftover = chunk;
                    if me.decoder.is_eof() {
                        me.end_of_input();
                    }
                }
                Poll::Ready(Err(err)) => {
                    debug!("response body read error: {}", err);
                    me.abandon();
                    return Poll::Ready(Err(err));
                }
                Poll::Pending => {
                    return match me.read_timeout.poll_elapsed(cx) {
                        Poll::Ready(err) => {
                            debug!("response body read timed out");
                            me.abandon();
                            Poll::Ready(Err(err))
                        }
                        Poll::Pending => Poll::Pending,
                    };
                }
            }
        }

        let n = cmp::min(buf.remaining(), me.leftover.len());
        buf.put_slice(&me.leftover.split_to(n));
        Poll::Ready(Ok(()))
    }
}

impl<T> Source for Http1BodySource<'_, T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn close(&mut self) -> io::Result<()> {
        if !self.finished {
            debug!("response body closed before its end");
            self.abandon();
        }
        Ok(())
    }
}
