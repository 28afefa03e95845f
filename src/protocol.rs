//! Protocol tags carried by a response.
//!
//! Instead of relying on typo-prone strings, the negotiated protocol of a
//! connection is described with the `Protocol` enum. Its `Display` form is
//! the ALPN identifier used during negotiation.
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The protocol a response was received over.
#[derive(PartialEq, PartialOrd, Copy, Clone, Eq, Ord, Hash, Debug)]
pub enum Protocol {
    /// `http/1.0`
    Http10,
    /// `http/1.1`
    Http11,
    /// `spdy/3.1`, the legacy multiplexed protocol.
    Spdy3,
    /// `h2`
    Http2,
}

impl Protocol {
    /// Looks up a protocol by its ALPN identifier.
    pub fn get(protocol: &str) -> crate::Result<Protocol> {
        match protocol {
            "http/1.0" => Ok(Protocol::Http10),
            "http/1.1" => Ok(Protocol::Http11),
            "spdy/3.1" => Ok(Protocol::Spdy3),
            "h2" => Ok(Protocol::Http2),
            _ => Err(Error::new_version()),
        }
    }

    /// Returns the ALPN identifier.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Protocol::Http10 => "http/1.0",
            Protocol::Http11 => "http/1.1",
            Protocol::Spdy3 => "spdy/3.1",
            Protocol::Http2 => "h2",
        }
    }

    /// Returns true for the multiplexed, framed protocols.
    pub fn is_framed(&self) -> bool {
        matches!(*self, Protocol::Spdy3 | Protocol::Http2)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Protocol> {
        Protocol::get(s)
    }
}
