use core::pin::Pin;
use core::task::{Context, Poll};

use futures_lite::io::{AsyncRead, AsyncWrite};
use pin_project::pin_project;

/// Joins a read half and a write half into one duplex transport.
///
/// Reads go to `reader`, writes and close go to `writer`. Cloning clones
/// both halves, so halves that share their state (such as
/// `async_dup::Arc<async_dup::Mutex<_>>`) make a transport that can be handed
/// to [`server::accept`](crate::server::accept).
#[pin_project]
#[derive(Debug, Clone)]
pub struct Duplex<R, W> {
    #[pin]
    reader: R,
    #[pin]
    writer: W,
}

impl<R, W> Duplex<R, W> {
    /// Create a new transport from its two halves.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Split back into the read and write halves.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: AsyncRead, W> AsyncRead for Duplex<R, W> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<std::io::Result<usize>> {
        self.project().reader.poll_read(cx, buf)
    }
}

impl<R, W: AsyncWrite> AsyncWrite for Duplex<R, W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.project().writer.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.project().writer.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.project().writer.poll_close(cx)
    }
}
