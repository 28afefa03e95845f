//! Response bodies.
//!
//! A response body is read through the [`Source`] trait: an `AsyncRead`
//! that can also be closed. Closing is how a reader tells the codec it is
//! done with the body, whether or not every byte was consumed, and it is
//! what releases the stream the body was read from.
//!
//! There are two pieces to this:
//!
//! - **The [`Source`] trait** is implemented by the byte sources a codec
//!   reads from: the HTTP/1.1 body decoder, or a framed stream's data.
//! - **The [`ResponseBody`] type** is what a codec hands to its caller. It
//!   buffers a `Source`, carries the response headers and closes the source
//!   exactly once.

pub use bytes::Bytes;

pub use self::response_body::ResponseBody;
pub use self::source::Source;
pub(crate) use self::finishing::StreamFinishingSource;

mod finishing;
mod response_body;
mod source;

fn _assert_send() {
    fn _assert_send<T: Send>() {}

    _assert_send::<ResponseBody<'static>>();
}
