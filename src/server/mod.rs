//! Process HTTP connections on the server.

use std::future::Future;
use std::time::Duration;

use async_io::Timer;
use futures_lite::future;
use futures_lite::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use log::debug;

use crate::{Error, Request, Result};

mod buffer;
mod decode;
mod encode;
mod listener;

pub use decode::{decode, decode_with_limit, ParserState, RequestParser};
pub use encode::{default_headers, ResponseWriter, StatusCode, WriterState};
pub use listener::{Connection, Server};

use encode::write_simple;

/// Configure the server.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Largest the request read buffer may grow to. Defaults to 64 KiB.
    max_buffer_len: Option<usize>,
    /// Timeout for receiving one request. Defaults to none.
    read_timeout: Option<Duration>,
    /// First delay after a failed accept. Defaults to 5ms.
    accept_backoff: Duration,
    /// Ceiling for the doubling accept delay. Defaults to 1s.
    max_accept_backoff: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_buffer_len: Some(64 * 1024),
            read_timeout: None,
            accept_backoff: Duration::from_millis(5),
            max_accept_backoff: Duration::from_secs(1),
        }
    }
}

impl ServerOptions {
    /// Cap the request read buffer. `None` lets it double without bound.
    pub fn max_buffer_len(mut self, len: Option<usize>) -> Self {
        self.max_buffer_len = len;
        self
    }

    /// Give up on a connection that has not delivered a whole request in
    /// time. `None` waits forever.
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the first and the largest delay between failed accepts.
    pub fn accept_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.accept_backoff = initial;
        self.max_accept_backoff = max.max(initial);
        self
    }
}

/// An error a buffered endpoint returns instead of a body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct HandlerError {
    /// The status to respond with.
    pub status: StatusCode,
    /// Sent as the response body.
    pub message: String,
}

impl HandlerError {
    /// Create a new instance.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Serve one HTTP/1.1 request on a connection, then close it.
///
/// The handler gets a [`ResponseWriter`] bound to the connection and the
/// parsed request, and is responsible for writing a complete response. A
/// request that fails to parse is answered with `400 Bad Request` without
/// calling the handler; a transport failure while reading drops the
/// connection without a response. Either way the error is returned.
pub async fn accept<RW, F, Fut>(io: RW, handler: F) -> Result<()>
where
    RW: AsyncRead + AsyncWrite + Clone + Unpin,
    F: FnOnce(ResponseWriter<RW>, Request) -> Fut,
    Fut: Future<Output = ()>,
{
    accept_with_opts(io, handler, Default::default()).await
}

/// Serve one HTTP/1.1 request on a connection, then close it.
pub async fn accept_with_opts<RW, F, Fut>(mut io: RW, handler: F, opts: ServerOptions) -> Result<()>
where
    RW: AsyncRead + AsyncWrite + Clone + Unpin,
    F: FnOnce(ResponseWriter<RW>, Request) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut reader = io.clone();
    let req = match read_request(&mut reader, &opts).await {
        Ok(req) => req,
        Err(err) if err.is_transport() => {
            debug!("dropping connection: {}", err);
            return Err(err);
        }
        Err(err) => {
            debug!("rejecting request: {}", err);
            let body = err.to_string();
            let sent = write_simple(&mut io, StatusCode::BadRequest, body.as_bytes()).await;
            if let Err(write_err) = sent {
                debug!("failed to send 400: {}", write_err);
            } else if let Err(close_err) = io.close().await {
                debug!("failed to close connection: {}", close_err);
            }
            return Err(err);
        }
    };

    debug!("{} {}", req.method(), req.target());
    handler(ResponseWriter::new(io.clone()), req).await;

    io.close().await?;
    Ok(())
}

/// Serve one request with an endpoint that produces a whole body at once.
///
/// `Ok(body)` is sent as `200 OK` with [`default_headers`]; a
/// [`HandlerError`] is sent with its status and its message as the body.
pub async fn accept_buffered<RW, F, Fut>(io: RW, endpoint: F) -> Result<()>
where
    RW: AsyncRead + AsyncWrite + Clone + Unpin,
    F: FnOnce(Request) -> Fut,
    Fut: Future<Output = std::result::Result<Vec<u8>, HandlerError>>,
{
    accept_buffered_with_opts(io, endpoint, Default::default()).await
}

/// Serve one request with an endpoint that produces a whole body at once.
pub async fn accept_buffered_with_opts<RW, F, Fut>(
    io: RW,
    endpoint: F,
    opts: ServerOptions,
) -> Result<()>
where
    RW: AsyncRead + AsyncWrite + Clone + Unpin,
    F: FnOnce(Request) -> Fut,
    Fut: Future<Output = std::result::Result<Vec<u8>, HandlerError>>,
{
    let handler = |res: ResponseWriter<RW>, req: Request| async move {
        let (status, body) = match endpoint(req).await {
            Ok(body) => (StatusCode::Ok, body),
            Err(err) => {
                debug!("endpoint failed: {}", err);
                (err.status, err.message.into_bytes())
            }
        };
        if let Err(err) = write_simple(res.into_inner(), status, &body).await {
            debug!("failed to write response: {}", err);
        }
    };
    accept_with_opts(io, handler, opts).await
}

async fn read_request<R>(reader: R, opts: &ServerOptions) -> Result<Request>
where
    R: AsyncRead + Unpin,
{
    let decoded = decode_with_limit(reader, opts.max_buffer_len);
    match opts.read_timeout {
        Some(timeout) => {
            future::or(decoded, async move {
                Timer::after(timeout).await;
                Err(Error::Timeout)
            })
            .await
        }
        None => decoded.await,
    }
}
