use std::cmp;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_util::future::poll_fn;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

use super::role;
use crate::config::DEFAULT_MAX_HEADER_SIZE;
use crate::error::Error;
use crate::response::ResponseBuilder;

/// The initial buffer size allocated before trying to read from IO.
pub(crate) const INIT_BUFFER_SIZE: usize = 8192;

/// A connection's read buffer, kept across the response head and its body.
pub(crate) struct Buffered<T> {
    io: T,
    max_buf_size: usize,
    read_buf: BytesMut,
}

impl<T> fmt::Debug for Buffered<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffered")
            .field("read_buf", &self.read_buf.len())
            .field("max_buf_size", &self.max_buf_size)
            .finish()
    }
}

impl<T> Buffered<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(io: T) -> Buffered<T> {
        Buffered {
            io,
            max_buf_size: DEFAULT_MAX_HEADER_SIZE,
            read_buf: BytesMut::with_capacity(0),
        }
    }

    pub(crate) fn set_max_buf_size(&mut self, max: usize) {
        self.max_buf_size = max;
    }

    #[cfg(test)]
    pub(crate) fn read_buf(&self) -> &[u8] {
        self.read_buf.as_ref()
    }

    pub(crate) async fn write_and_flush(&mut self, buf: &[u8]) -> io::Result<()> {
        self.io.write_all(buf).await?;
        debug!("flushed {} bytes", buf.len());
        self.io.flush().await
    }

    /// Reads until a complete response head is buffered, then parses it.
    pub(crate) async fn read_response_head(&mut self) -> crate::Result<ResponseBuilder> {
        loop {
            if let Some(head) = role::parse_response(&mut self.read_buf)? {
                return Ok(head);
            }
            if self.read_buf.len() >= self.max_buf_size {
                debug!("max_buf_size ({}) reached, closing", self.max_buf_size);
                return Err(Error::new_too_large());
            }
            let n = poll_fn(|cx| self.poll_read_from_io(cx))
                .await
                .map_err(Error::new_io)?;
            if n == 0 {
                trace!("parse eof");
                return Err(Error::new_incomplete());
            }
        }
    }

    pub(crate) fn poll_read_from_io(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<usize>> {
        let mut chunk = [0u8; INIT_BUFFER_SIZE];
        let mut buf = ReadBuf::new(&mut chunk);
        ready!(Pin::new(&mut self.io).poll_read(cx, &mut buf))?;
        let n = buf.filled().len();
        trace!("received {} bytes", n);
        self.read_buf.extend_from_slice(buf.filled());
        Poll::Ready(Ok(n))
    }
}

pub(crate) trait MemRead {
    fn read_mem(&mut self, cx: &mut Context<'_>, len: usize) -> Poll<io::Result<Bytes>>;
}

impl<T> MemRead for Buffered<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    fn read_mem(&mut self, cx: &mut Context<'_>, len: usize) -> Poll<io::Result<Bytes>> {
        if !self.read_buf.is_empty() {
            let n = cmp::min(len, self.read_buf.len());
            Poll::Ready(Ok(self.read_buf.split_to(n).freeze()))
        } else {
            let n = ready!(self.poll_read_from_io(cx))?;
            Poll::Ready(Ok(self.read_buf.split_to(cmp::min(len, n)).freeze()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[tokio::test]
    async fn read_response_head_across_reads() {
        let _ = pretty_env_logger::try_init();
        let mock = tokio_test::io::Builder::new()
            .read(b"HTTP/1.1 200 OK\r\n")
            .read(b"Content-Length: 3\r\n\r\nabc")
            .build();
        let mut buffered = Buffered::new(mock);

        let head = buffered.read_response_head().await.unwrap();
        assert_eq!(head.status_ref(), Some(StatusCode::OK));
        assert_eq!(buffered.read_buf(), b"abc");
    }

    #[tokio::test]
    async fn read_response_head_eof() {
        let mock = tokio_test::io::Builder::new()
            .read(b"HTTP/1.1 200 OK\r\n")
            .build();
        let mut buffered = Buffered::new(mock);

        let err = buffered.read_response_head().await.unwrap_err();
        assert!(err.is_incomplete_message());
    }

    #[tokio::test]
    async fn read_response_head_too_large() {
        let mut head = b"HTTP/1.1 200 OK\r\nX-Large: ".to_vec();
        // exactly one read's worth, without the end of the head
        let fill = INIT_BUFFER_SIZE - head.len();
        head.extend(std::iter::repeat(b'a').take(fill));
        let mock = tokio_test::io::Builder::new().read(&head).build();
        let mut buffered = Buffered::new(mock);
        buffered.set_max_buf_size(8192);

        let err = buffered.read_response_head().await.unwrap_err();
        assert!(err.is_parse());
    }

    #[tokio::test]
    async fn read_mem_serves_buffer_first() {
        let mock = tokio_test::io::Builder::new()
            .read(b"HTTP/1.1 200 OK\r\n\r\nhello")
            .read(b" world")
            .build();
        let mut buffered = Buffered::new(mock);
        buffered.read_response_head().await.unwrap();

        let first = poll_fn(|cx| buffered.read_mem(cx, 64)).await.unwrap();
        assert_eq!(first, "hello");
        let second = poll_fn(|cx| buffered.read_mem(cx, 3)).await.unwrap();
        assert_eq!(second, " wo");
        let third = poll_fn(|cx| buffered.read_mem(cx, 64)).await.unwrap();
        assert_eq!(third, "rld");
    }
}
