#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(async_fn_in_trait)]

//! # h2c-stream
//!
//! A client-side HTTP stream codec that starts life speaking HTTP/1.1 and
//! can be told, after the request went out, that the connection has been
//! upgraded to a multiplexed framed protocol (HTTP/2 or SPDY/3).
//!
//! [`Http1Codec`] writes requests and reads responses over a plain
//! connection. [`Http2cCodec`] wraps one, and once it has been bound to a
//! [`FramedConnection`] it reads the response headers and body from a new
//! logical stream instead. Closing the returned [`ResponseBody`] reports the
//! stream as finished to the [`StreamAllocation`] exactly once.
//!
//! The framed connection itself (frames, header compression, flow control)
//! is not implemented here; it is supplied through the [`FramedConnection`]
//! and [`FramedStream`] traits.

pub use crate::body::{ResponseBody, Source};
pub use crate::common::timeout::Timeout;
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::proto::framed::{
    read_http2_headers, read_spdy3_headers, FramedConnection, FramedStream, Header,
};
pub use crate::proto::h1::Http1Codec;
pub use crate::proto::upgrade::Http2cCodec;
pub use crate::proto::{CodecId, HttpCodec, StreamAllocation};
pub use crate::protocol::Protocol;
pub use crate::response::{Response, ResponseBuilder, StatusLine};

#[macro_use]
mod trace;
#[macro_use]
mod common;

pub mod body;
mod config;
pub mod error;
mod headers;
#[cfg(test)]
mod mock;
mod proto;
mod protocol;
mod response;
