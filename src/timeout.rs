use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_io::Timer;
use futures_lite::{AsyncRead, AsyncWrite, FutureExt};

fn timed_out(limit: Duration) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("timed out after {} ms", limit.as_millis()),
    )
}

/// Races `future` against `limit`; `None` waits as long as it takes.
pub async fn within<T, F>(limit: Option<Duration>, future: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match limit {
        None => future.await,
        Some(limit) => {
            future
                .or(async move {
                    Timer::after(limit).await;
                    Err(timed_out(limit))
                })
                .await
        }
    }
}

/// A stream whose reads, writes and close fail with `TimedOut` once one of them
/// has waited `limit` without progress. Every completed operation restarts the clock.
pub struct IdleTimeout<S> {
    inner: S,
    limit: Option<Duration>,
    timer: Option<Timer>,
}

impl<S> IdleTimeout<S> {
    pub fn new(inner: S, limit: Option<Duration>) -> Self {
        Self {
            inner,
            limit,
            timer: None,
        }
    }

    fn poll_idle<T>(&mut self, cx: &mut Context<'_>, poll: Poll<io::Result<T>>) -> Poll<io::Result<T>> {
        if poll.is_ready() {
            self.timer = None;
            return poll;
        }
        let Some(limit) = self.limit else {
            return Poll::Pending;
        };

        let timer = self.timer.get_or_insert_with(|| Timer::after(limit));
        match Future::poll(Pin::new(timer), cx) {
            Poll::Ready(_) => {
                self.timer = None;
                Poll::Ready(Err(timed_out(limit)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for IdleTimeout<S> {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        this.poll_idle(cx, poll)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for IdleTimeout<S> {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        this.poll_idle(cx, poll)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_flush(cx);
        this.poll_idle(cx, poll)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_close(cx);
        this.poll_idle(cx, poll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::io::Cursor;
    use futures_lite::{future, AsyncReadExt};

    // Never yields a byte
    struct Stalled;

    impl AsyncRead for Stalled {
        fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut [u8]) -> Poll<io::Result<usize>> {
            Poll::Pending
        }
    }

    // Yields one byte per tick until `remaining` runs out
    struct Trickle {
        remaining: usize,
        interval: Duration,
        tick: Timer,
    }

    impl Trickle {
        fn new(remaining: usize, interval: Duration) -> Self {
            Self {
                remaining,
                interval,
                tick: Timer::after(interval),
            }
        }
    }

    impl AsyncRead for Trickle {
        fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
            if self.remaining == 0 || buf.is_empty() {
                return Poll::Ready(Ok(0));
            }
            match Future::poll(Pin::new(&mut self.tick), cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(_) => {
                    let interval = self.interval;
                    self.tick.set_after(interval);
                    self.remaining -= 1;
                    buf[0] = b'x';
                    Poll::Ready(Ok(1))
                }
            }
        }
    }

    #[test]
    fn stalled_read_times_out() {
        let mut stream = IdleTimeout::new(Stalled, Some(Duration::from_millis(20)));
        let mut buf = [0u8; 8];
        let err = future::block_on(stream.read(&mut buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn steady_progress_outlasts_the_limit() {
        let limit = Duration::from_millis(150);
        let mut stream = IdleTimeout::new(Trickle::new(8, Duration::from_millis(40)), Some(limit));

        let started = std::time::Instant::now();
        let mut body = Vec::new();
        future::block_on(stream.read_to_end(&mut body)).unwrap();

        assert_eq!(body, b"xxxxxxxx");
        assert!(started.elapsed() > limit);
    }

    #[test]
    fn ready_reads_ignore_the_limit() {
        let mut stream = IdleTimeout::new(Cursor::new(b"ready".to_vec()), Some(Duration::from_millis(1)));
        let mut body = Vec::new();
        future::block_on(stream.read_to_end(&mut body)).unwrap();
        assert_eq!(body, b"ready");
    }

    #[test]
    fn pending_future_times_out() {
        let result: io::Result<()> =
            future::block_on(within(Some(Duration::from_millis(20)), future::pending()));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn ready_future_wins() {
        let result = future::block_on(within(Some(Duration::from_secs(5)), async { Ok(7) }));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn no_limit_just_awaits() {
        let result = future::block_on(within(None, async { Ok("done") }));
        assert_eq!(result.unwrap(), "done");
    }
}
