use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::{sleep, Instant, Sleep};

/// A settable limit on how long a read or write may wait.
///
/// A framed stream exposes one for reads and one for writes, and the codec
/// configures both before it waits on the stream. A `Timeout` with no
/// duration never elapses.
///
/// Expiry is reported as an `io::Error` of kind `TimedOut`.
pub struct Timeout {
    duration: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Timeout {
    /// Creates a timeout that never elapses.
    pub fn new() -> Timeout {
        Timeout {
            duration: None,
            sleep: None,
        }
    }

    /// Sets the duration, replacing any previous one. `None` disables the timeout.
    pub fn set(&mut self, duration: Option<Duration>) -> &mut Timeout {
        self.duration = duration;
        self.sleep = None;
        self
    }

    /// Returns the configured duration, if any.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Runs `fut` to completion, or fails with `TimedOut` if it takes longer
    /// than the configured duration.
    pub async fn run<F: Future>(&self, fut: F) -> io::Result<F::Output> {
        match self.duration {
            Some(duration) => tokio::time::timeout(duration, fut)
                .await
                .map_err(|_| timed_out()),
            None => Ok(fut.await),
        }
    }

    /// Polls the idle timer, starting it if needed.
    ///
    /// Returns `Ready` with a `TimedOut` error once the duration passed
    /// without a call to [`Timeout::reset`].
    pub fn poll_elapsed(&mut self, cx: &mut Context<'_>) -> Poll<io::Error> {
        let duration = match self.duration {
            Some(duration) => duration,
            None => return Poll::Pending,
        };
        let timer = self
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(duration)));
        match timer.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(timed_out()),
            Poll::Pending => Poll::Pending,
        }
    }

    /// Restarts the idle timer after progress was made.
    pub fn reset(&mut self) {
        if let (Some(duration), Some(sleep)) = (self.duration, self.sleep.as_mut()) {
            sleep.as_mut().reset(Instant::now() + duration);
        }
    }
}

impl Default for Timeout {
    fn default() -> Timeout {
        Timeout::new()
    }
}

impl fmt::Debug for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("duration", &self.duration)
            .finish()
    }
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "timeout elapsed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future;

    #[tokio::test(start_paused = true)]
    async fn run_times_out() {
        let mut timeout = Timeout::new();
        timeout.set(Some(Duration::from_secs(5)));
        let err = timeout
            .run(future::pending::<()>())
            .await
            .expect_err("pending future should time out");
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn run_without_duration_waits() {
        let timeout = Timeout::new();
        let out = timeout
            .run(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                7
            })
            .await
            .expect("no timeout configured");
        assert_eq!(out, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_elapsed_after_idle() {
        let mut timeout = Timeout::new();
        timeout.set(Some(Duration::from_millis(100)));
        let err = future::poll_fn(|cx| timeout.poll_elapsed(cx)).await;
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn poll_elapsed_without_duration_is_pending() {
        let mut timeout = Timeout::new();
        let mut cx = Context::from_waker(futures_util::task::noop_waker_ref());
        assert!(timeout.poll_elapsed(&mut cx).is_pending());
    }
}
