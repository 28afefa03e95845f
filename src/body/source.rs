use std::io;

use tokio::io::AsyncRead;

/// A readable stream of body bytes that must be closed when the reader is done.
///
/// `close` may be called before the source reached its end; implementations
/// release whatever the source holds, and a later `poll_read` may fail.
pub trait Source: AsyncRead + Unpin + Send {
    /// Closes the source, releasing the resources held for it.
    fn close(&mut self) -> io::Result<()>;
}

impl<S: Source + ?Sized> Source for &mut S {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
