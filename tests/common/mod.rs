use std::pin::Pin;
use std::task::{Context, Poll};

use async_dup::{Arc, Mutex};
use futures_lite::io::{AsyncRead, AsyncWrite, Cursor};
use wire_h1::Duplex;

#[allow(dead_code)]
pub type Shared = Arc<Mutex<Cursor<Vec<u8>>>>;

#[allow(dead_code)]
pub type TestIO<R = Shared> = Duplex<R, Shared>;

#[allow(dead_code)]
pub fn shared(data: impl Into<Vec<u8>>) -> Shared {
    Arc::new(Mutex::new(Cursor::new(data.into())))
}

/// A transport whose read half yields `input` and whose write half records
/// everything written. Returns the transport and a handle to the output.
#[allow(dead_code)]
pub fn transport(input: impl Into<Vec<u8>>) -> (TestIO, Shared) {
    let output = shared(vec![]);
    (Duplex::new(shared(input), output.clone()), output)
}

/// Like [`transport`], but the read half hands out a single byte per read.
#[allow(dead_code)]
pub fn one_byte_transport(input: impl Into<Vec<u8>>) -> (TestIO<OneByteReader<Shared>>, Shared) {
    let output = shared(vec![]);
    let reader = OneByteReader::new(shared(input));
    (Duplex::new(reader, output.clone()), output)
}

#[allow(dead_code)]
pub fn output_string(output: &Shared) -> String {
    String::from_utf8(output.lock().get_ref().clone()).unwrap()
}

/// Forwards reads to `R` one byte at a time.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct OneByteReader<R> {
    inner: R,
}

impl<R> OneByteReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for OneByteReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<std::io::Result<usize>> {
        let len = buf.len().min(1);
        Pin::new(&mut self.inner).poll_read(cx, &mut buf[..len])
    }
}

/// A read half that never produces data.
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct StalledReader;

impl AsyncRead for StalledReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut [u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Pending
    }
}

/// A read half whose peer has reset the connection.
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct ResetReader;

impl AsyncRead for ResetReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut [u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Err(std::io::ErrorKind::ConnectionReset.into()))
    }
}

/// A write half whose every write fails with a broken pipe.
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct BrokenWriter;

impl AsyncWrite for BrokenWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
    }
}
