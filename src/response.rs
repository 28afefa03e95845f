//! The protocol-agnostic response head.
use std::fmt;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

use crate::error::{Error, Parse};
use crate::protocol::Protocol;

/// A parsed status line: `HTTP/1.1 200 OK`.
///
/// `ICY 200 OK` (as sent by some streaming audio servers) is accepted and
/// treated as HTTP/1.0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    /// The protocol named at the start of the line.
    pub protocol: Protocol,
    /// The three digit status code.
    pub code: u16,
    /// The reason phrase, possibly empty.
    pub message: String,
}

impl StatusLine {
    /// Parses a status line such as `HTTP/1.1 404 Not Found`.
    pub fn parse(line: &str) -> crate::Result<StatusLine> {
        let bytes = line.as_bytes();
        let (protocol, code_start) = if line.starts_with("HTTP/1.") {
            if bytes.len() < 9 || bytes[8] != b' ' {
                trace!("unexpected status line: {:?}", line);
                return Err(Error::new_version());
            }
            let protocol = match bytes[7] {
                b'0' => Protocol::Http10,
                b'1' => Protocol::Http11,
                _ => {
                    trace!("unexpected status line: {:?}", line);
                    return Err(Error::new_version());
                }
            };
            (protocol, 9)
        } else if line.starts_with("ICY ") {
            (Protocol::Http10, 4)
        } else {
            trace!("unexpected status line: {:?}", line);
            return Err(Error::new_version());
        };

        if bytes.len() < code_start + 3 {
            return Err(Error::new_status());
        }
        let digits = &bytes[code_start..code_start + 3];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(Error::new_status());
        }
        let code = digits
            .iter()
            .fold(0u16, |code, &b| code * 10 + (b - b'0') as u16);

        // A reason phrase, if any, is separated from the code by one space.
        let message = if bytes.len() > code_start + 3 {
            if bytes[code_start + 3] != b' ' {
                return Err(Error::new_status());
            }
            line[code_start + 4..].to_owned()
        } else {
            String::new()
        };

        Ok(StatusLine {
            protocol,
            code,
            message,
        })
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = match self.protocol {
            Protocol::Http10 => "HTTP/1.0",
            _ => "HTTP/1.1",
        };
        write!(f, "{} {}", version, self.code)?;
        if !self.message.is_empty() {
            write!(f, " {}", self.message)?;
        }
        Ok(())
    }
}

/// The head of an HTTP response, independent of the protocol it arrived on.
#[derive(Clone)]
pub struct Response {
    protocol: Protocol,
    status: StatusCode,
    message: String,
    headers: HeaderMap,
}

impl Response {
    /// Creates a new builder.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// The protocol the response was received over.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The response status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase. Framed protocols carry none, so it is often empty.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("protocol", &self.protocol)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}

/// Builds a [`Response`] incrementally.
///
/// Header translation produces a builder, and the codec may then replace the
/// protocol before handing it to the caller.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    protocol: Option<Protocol>,
    status: Option<StatusCode>,
    message: String,
    headers: HeaderMap,
}

impl ResponseBuilder {
    /// Creates an empty builder.
    pub fn new() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// Sets the protocol, replacing any protocol set before.
    pub fn protocol(mut self, protocol: Protocol) -> ResponseBuilder {
        self.protocol = Some(protocol);
        self
    }

    /// Sets the status code.
    pub fn status(mut self, status: StatusCode) -> ResponseBuilder {
        self.status = Some(status);
        self
    }

    /// Sets the reason phrase.
    pub fn message<S: Into<String>>(mut self, message: S) -> ResponseBuilder {
        self.message = message.into();
        self
    }

    /// Appends a header, keeping any earlier values with the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> ResponseBuilder {
        self.headers.append(name, value);
        self
    }

    /// Replaces all headers.
    pub fn headers(mut self, headers: HeaderMap) -> ResponseBuilder {
        self.headers = headers;
        self
    }

    /// Applies the protocol, code and reason phrase of a status line.
    pub fn status_line(self, line: StatusLine) -> crate::Result<ResponseBuilder> {
        let status = StatusCode::from_u16(line.code).map_err(Parse::from)?;
        Ok(self
            .protocol(line.protocol)
            .status(status)
            .message(line.message))
    }

    /// The protocol set so far.
    pub fn protocol_ref(&self) -> Option<Protocol> {
        self.protocol
    }

    /// The status set so far.
    pub fn status_ref(&self) -> Option<StatusCode> {
        self.status
    }

    /// The headers added so far.
    pub fn headers_ref(&self) -> &HeaderMap {
        &self.headers
    }

    /// Finishes the response.
    ///
    /// Fails if no protocol or no status was set.
    pub fn build(self) -> crate::Result<Response> {
        match (self.protocol, self.status) {
            (Some(protocol), Some(status)) => Ok(Response {
                protocol,
                status,
                message: self.message,
                headers: self.headers,
            }),
            _ => Err(Error::new_user_incomplete_response()),
        }
    }
}
