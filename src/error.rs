//! Error and Result module.
use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Result type often returned from methods that can have h2c-stream `Error`s.
pub type Result<T> = std::result::Result<T, Error>;

type Cause = Box<dyn StdError + Send + Sync>;

/// Represents errors that can occur reading or writing an HTTP exchange.
pub struct Error {
    inner: Box<ErrorImpl>,
}

struct ErrorImpl {
    kind: Kind,
    cause: Option<Cause>,
}

#[derive(Debug, PartialEq)]
pub(super) enum Kind {
    Parse(Parse),
    /// A message reached EOF, but is not complete.
    Incomplete,
    /// An `io::Error` that occurred while trying to read or write to a network stream,
    /// or while opening a stream on a framed connection.
    Io,
    /// The codec was driven in a way its contract forbids.
    User(User),
}

#[derive(Debug, PartialEq)]
pub(super) enum Parse {
    Version,
    Status,
    Header,
    TooLarge,
    /// A required pseudo-header such as `:status` was absent.
    PseudoHeader,
}

#[derive(Debug, PartialEq)]
pub(super) enum User {
    /// A framed connection was set on a codec that already has one.
    DuplicateUpgrade,
    /// A framed connection was set after response headers were read.
    LateUpgrade,
    /// Response headers were requested twice from an upgraded codec.
    DuplicateHeaderRead,
    /// A codec operation was called out of order.
    UnexpectedState,
    /// A response was built without a protocol or status.
    IncompleteResponse,
}

impl Error {
    /// Returns true if this was an HTTP parse error, such as malformed or
    /// incomplete response headers.
    pub fn is_parse(&self) -> bool {
        matches!(self.inner.kind, Kind::Parse(_))
    }

    /// Returns true if this error was caused by the codec being misused.
    pub fn is_user(&self) -> bool {
        matches!(self.inner.kind, Kind::User(_))
    }

    /// Returns true if the connection closed before a message could complete.
    pub fn is_incomplete_message(&self) -> bool {
        matches!(self.inner.kind, Kind::Incomplete)
    }

    /// Returns true if this was an I/O error from the underlying transport.
    pub fn is_io(&self) -> bool {
        matches!(self.inner.kind, Kind::Io)
    }

    /// Returns true if this error was caused by a read or write timeout elapsing.
    pub fn is_timeout(&self) -> bool {
        self.find_source::<io::Error>()
            .map(|err| err.kind() == io::ErrorKind::TimedOut)
            .unwrap_or(false)
    }

    /// Consumes the error, returning its cause.
    pub fn into_cause(self) -> Option<Box<dyn StdError + Send + Sync>> {
        self.inner.cause
    }

    pub(super) fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(ErrorImpl { kind, cause: None }),
        }
    }

    pub(super) fn with<C: Into<Cause>>(mut self, cause: C) -> Error {
        self.inner.cause = Some(cause.into());
        self
    }

    #[cfg(test)]
    pub(super) fn kind(&self) -> &Kind {
        &self.inner.kind
    }

    fn find_source<E: StdError + 'static>(&self) -> Option<&E> {
        let mut cause = self.source();
        while let Some(err) = cause {
            if let Some(typed) = err.downcast_ref::<E>() {
                return Some(typed);
            }
            cause = err.source();
        }

        // else
        None
    }

    pub(super) fn new_incomplete() -> Error {
        Error::new(Kind::Incomplete)
    }

    pub(super) fn new_too_large() -> Error {
        Error::new(Kind::Parse(Parse::TooLarge))
    }

    pub(super) fn new_header() -> Error {
        Error::new(Kind::Parse(Parse::Header))
    }

    pub(super) fn new_version() -> Error {
        Error::new(Kind::Parse(Parse::Version))
    }

    pub(super) fn new_status() -> Error {
        Error::new(Kind::Parse(Parse::Status))
    }

    pub(super) fn new_pseudo_header(name: &'static str) -> Error {
        Error::new(Kind::Parse(Parse::PseudoHeader)).with(format!("expected {:?} header not present", name))
    }

    pub(super) fn new_io(cause: io::Error) -> Error {
        Error::new(Kind::Io).with(cause)
    }

    fn new_user(user: User) -> Error {
        Error::new(Kind::User(user))
    }

    pub(super) fn new_user_duplicate_upgrade() -> Error {
        Error::new_user(User::DuplicateUpgrade)
    }

    pub(super) fn new_user_late_upgrade() -> Error {
        Error::new_user(User::LateUpgrade)
    }

    pub(super) fn new_user_duplicate_header_read() -> Error {
        Error::new_user(User::DuplicateHeaderRead)
    }

    pub(super) fn new_user_unexpected_state(state: &dyn fmt::Debug) -> Error {
        Error::new_user(User::UnexpectedState).with(format!("state: {:?}", state))
    }

    pub(super) fn new_user_incomplete_response() -> Error {
        Error::new_user(User::IncompleteResponse)
    }

    fn description(&self) -> &str {
        match self.inner.kind {
            Kind::Parse(Parse::Version) => "invalid HTTP version parsed",
            Kind::Parse(Parse::Status) => "invalid HTTP status-code parsed",
            Kind::Parse(Parse::Header) => "invalid HTTP header parsed",
            Kind::Parse(Parse::TooLarge) => "message head is too large",
            Kind::Parse(Parse::PseudoHeader) => "invalid response headers",
            Kind::Incomplete => "connection closed before message completed",
            Kind::Io => "connection error",
            Kind::User(User::DuplicateUpgrade) => "framed connection already set",
            Kind::User(User::LateUpgrade) => "framed connection set after response headers were read",
            Kind::User(User::DuplicateHeaderRead) => "response headers already read from framed stream",
            Kind::User(User::UnexpectedState) => "codec operation called in unexpected state",
            Kind::User(User::IncompleteResponse) => "response requires a protocol and status",
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_tuple("h2c_stream::Error");
        f.field(&self.inner.kind);
        if let Some(ref cause) = self.inner.cause {
            f.field(cause);
        }
        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref cause) = self.inner.cause {
            write!(f, "{}: {}", self.description(), cause)
        } else {
            f.write_str(self.description())
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .cause
            .as_ref()
            .map(|cause| &**cause as &(dyn StdError + 'static))
    }
}

#[doc(hidden)]
impl From<Parse> for Error {
    fn from(err: Parse) -> Error {
        Error::new(Kind::Parse(err))
    }
}

impl From<httparse::Error> for Parse {
    fn from(err: httparse::Error) -> Parse {
        match err {
            httparse::Error::HeaderName
            | httparse::Error::HeaderValue
            | httparse::Error::NewLine
            | httparse::Error::Token => Parse::Header,
            httparse::Error::Status => Parse::Status,
            httparse::Error::TooManyHeaders => Parse::TooLarge,
            httparse::Error::Version => Parse::Version,
        }
    }
}

impl From<http::status::InvalidStatusCode> for Parse {
    fn from(_: http::status::InvalidStatusCode) -> Parse {
        Parse::Status
    }
}

impl From<http::header::InvalidHeaderName> for Parse {
    fn from(_: http::header::InvalidHeaderName) -> Parse {
        Parse::Header
    }
}

impl From<http::header::InvalidHeaderValue> for Parse {
    fn from(_: http::header::InvalidHeaderValue) -> Parse {
        Parse::Header
    }
}

fn _assert_send_sync() {
    fn _assert<T: Send + Sync + 'static>() {}
    _assert::<Error>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn error_size_of() {
        assert_eq!(mem::size_of::<Error>(), mem::size_of::<usize>());
    }

    #[test]
    fn timeout_is_found_through_the_cause() {
        let err = Error::new_io(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
        assert!(err.is_io());
        assert!(err.is_timeout());
        assert!(!err.is_parse());
    }

    #[test]
    fn io_cause_is_surfaced_unchanged() {
        let err = Error::new_io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        let cause = err.into_cause().expect("cause");
        let io = cause.downcast::<io::Error>().expect("io::Error");
        assert_eq!(io.kind(), io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn parse_from_httparse() {
        let err = Error::from(Parse::from(httparse::Error::TooManyHeaders));
        assert_eq!(err.kind(), &Kind::Parse(Parse::TooLarge));
        assert!(err.is_parse());
    }

    #[test]
    fn display_includes_cause() {
        let err = Error::new_pseudo_header(":status");
        assert!(err.is_parse());
        assert_eq!(
            err.to_string(),
            "invalid response headers: expected \":status\" header not present"
        );
    }
}
