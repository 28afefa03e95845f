use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::task::{Context, Poll};

use bytes::Bytes;

use super::MemRead;

/// Upper bound on the bytes of trailer fields after the last chunk.
const MAX_TRAILER_SIZE: usize = 16 * 1024;

/// How much to ask for per read of a close-delimited body.
const EOF_READ_SIZE: usize = 8192;

/// Splits a response body off the connection according to its framing.
#[derive(Clone, PartialEq)]
pub(crate) struct Decoder {
    kind: Kind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    /// `Content-Length` framing; holds the bytes still expected.
    Length(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked(Chunked),
    /// No length at all: the body runs until the server closes the
    /// connection. The flag is set once EOF was seen.
    Eof(bool),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Chunked {
    state: State,
    /// Size of the current chunk while its line is parsed, then the bytes
    /// of it not yet handed out.
    remaining: u64,
    trailer_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// First hex digit of a chunk-size line.
    SizeStart,
    Size,
    /// Whitespace between the size and an extension or the line end.
    SizeWs,
    /// `;ext=...` up to the CR. Extensions carry nothing we use.
    Extension,
    SizeLf,
    Data,
    DataCr,
    DataLf,
    /// Start of a line after the last chunk: a trailer field or the blank
    /// line that ends the body.
    TrailerStart,
    Trailer,
    TrailerLf,
    EndLf,
    Done,
}

impl Decoder {
    pub(crate) fn length(len: u64) -> Decoder {
        Decoder {
            kind: Kind::Length(len),
        }
    }

    pub(crate) fn chunked() -> Decoder {
        Decoder {
            kind: Kind::Chunked(Chunked {
                state: State::SizeStart,
                remaining: 0,
                trailer_len: 0,
            }),
        }
    }

    pub(crate) fn eof() -> Decoder {
        Decoder {
            kind: Kind::Eof(false),
        }
    }

    /// Whether the whole body has been handed out.
    pub(crate) fn is_eof(&self) -> bool {
        match self.kind {
            Kind::Length(remaining) => remaining == 0,
            Kind::Chunked(ref chunked) => chunked.state == State::Done,
            Kind::Eof(seen) => seen,
        }
    }

    /// Whether the end of this body is marked by the connection closing.
    pub(crate) fn is_close_delimited(&self) -> bool {
        matches!(self.kind, Kind::Eof(_))
    }

    /// Reads the next slice of body bytes. An empty slice means the body
    /// is complete; asking again keeps returning empty slices.
    pub(crate) fn decode<R: MemRead>(
        &mut self,
        cx: &mut Context<'_>,
        body: &mut R,
    ) -> Poll<io::Result<Bytes>> {
        trace!("decode; state={:?}", self.kind);
        match self.kind {
            Kind::Length(ref mut remaining) => {
                if *remaining == 0 {
                    return Poll::Ready(Ok(Bytes::new()));
                }
                let data = ready!(body.read_mem(cx, clamp(*remaining)))?;
                if data.is_empty() {
                    return Poll::Ready(Err(incomplete()));
                }
                *remaining = remaining.saturating_sub(data.len() as u64);
                Poll::Ready(Ok(data))
            }
            Kind::Chunked(ref mut chunked) => chunked.poll_data(cx, body),
            Kind::Eof(ref mut seen) => {
                if *seen {
                    return Poll::Ready(Ok(Bytes::new()));
                }
                let data = ready!(body.read_mem(cx, EOF_READ_SIZE))?;
                *seen = data.is_empty();
                Poll::Ready(Ok(data))
            }
        }
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.kind, f)
    }
}

impl Chunked {
    fn poll_data<R: MemRead>(
        &mut self,
        cx: &mut Context<'_>,
        body: &mut R,
    ) -> Poll<io::Result<Bytes>> {
        loop {
            match self.state {
                State::Done => return Poll::Ready(Ok(Bytes::new())),
                State::Data => {
                    let data = ready!(body.read_mem(cx, clamp(self.remaining)))?;
                    if data.is_empty() {
                        return Poll::Ready(Err(incomplete()));
                    }
                    self.remaining -= data.len() as u64;
                    if self.remaining == 0 {
                        self.state = State::DataCr;
                    }
                    return Poll::Ready(Ok(data));
                }
                _ => {
                    let byte = ready!(poll_byte(cx, body))?;
                    self.state = self.next(byte)?;
                    if self.state == State::Done {
                        trace!("end of chunked body");
                    }
                }
            }
        }
    }

    /// Feeds one framing byte, returning the state it leads to.
    fn next(&mut self, byte: u8) -> io::Result<State> {
        match (self.state, byte) {
            (State::SizeStart, _) | (State::Size, _) if hex(byte).is_some() => {
                let digit = hex(byte).map(u64::from).unwrap_or_default();
                self.remaining = self
                    .remaining
                    .checked_mul(16)
                    .and_then(|size| size.checked_add(digit))
                    .ok_or_else(|| invalid_data("chunk size overflows"))?;
                Ok(State::Size)
            }
            (State::SizeStart, _) => Err(invalid_input("missing chunk size")),

            (State::Size, b'\t' | b' ') | (State::SizeWs, b'\t' | b' ') => Ok(State::SizeWs),
            (State::Size, b';') | (State::SizeWs, b';') => Ok(State::Extension),
            (State::Size, b'\r') | (State::SizeWs, b'\r') => Ok(State::SizeLf),
            (State::Size, _) | (State::SizeWs, _) => Err(invalid_input("invalid chunk size line")),

            (State::Extension, b'\r') => Ok(State::SizeLf),
            (State::Extension, b'\n') => Err(invalid_data("bare LF in chunk extension")),
            (State::Extension, _) => Ok(State::Extension),

            (State::SizeLf, b'\n') if self.remaining == 0 => Ok(State::TrailerStart),
            (State::SizeLf, b'\n') => {
                debug!("incoming chunk: {0:#X} ({0} bytes)", self.remaining);
                Ok(State::Data)
            }

            (State::DataCr, b'\r') => Ok(State::DataLf),
            (State::DataLf, b'\n') => Ok(State::SizeStart),

            (State::TrailerStart, b'\r') => Ok(State::EndLf),
            (State::TrailerStart, b'\n') | (State::Trailer, b'\n') => {
                Err(invalid_input("bare LF in chunked trailer"))
            }
            (State::TrailerStart, _) | (State::Trailer, _) => {
                self.trailer_len += 1;
                if self.trailer_len > MAX_TRAILER_SIZE {
                    return Err(invalid_data("chunked trailer fields too large"));
                }
                if byte == b'\r' {
                    Ok(State::TrailerLf)
                } else {
                    Ok(State::Trailer)
                }
            }
            (State::TrailerLf, b'\n') => {
                trace!("skipped chunked trailer field");
                Ok(State::TrailerStart)
            }

            (State::EndLf, b'\n') => Ok(State::Done),

            (State::SizeLf, _) | (State::TrailerLf, _) | (State::EndLf, _) => {
                Err(invalid_input("expected LF after CR in chunked framing"))
            }
            (State::DataCr, _) | (State::DataLf, _) => {
                Err(invalid_input("chunk data not followed by CRLF"))
            }
            (State::Data, _) | (State::Done, _) => Ok(self.state),
        }
    }
}

fn poll_byte<R: MemRead>(cx: &mut Context<'_>, body: &mut R) -> Poll<io::Result<u8>> {
    let buf = ready!(body.read_mem(cx, 1))?;
    match buf.first() {
        Some(&byte) => Poll::Ready(Ok(byte)),
        None => Poll::Ready(Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "unexpected EOF in chunked framing",
        ))),
    }
}

fn hex(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn clamp(remaining: u64) -> usize {
    usize::try_from(remaining).unwrap_or(usize::MAX)
}

fn invalid_input(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

fn invalid_data(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn incomplete() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, IncompleteBody)
}

#[derive(Debug)]
struct IncompleteBody;

impl fmt::Display for IncompleteBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection closed before the response body ended")
    }
}

impl StdError for IncompleteBody {}
