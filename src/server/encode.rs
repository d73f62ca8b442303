//! Encode HTTP responses on the server.

use std::fmt;

use futures_lite::io::{AsyncWrite, AsyncWriteExt};
use log::trace;

use crate::chunked::{encode_chunk, LAST_CHUNK};
use crate::error::WriterOrderError;
use crate::{Error, Headers, Result};

/// The status codes a response can be sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// The numeric code.
    pub fn code(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::InternalServerError => 500,
        }
    }

    /// The reason phrase sent after the code.
    pub fn reason(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// Where a [`ResponseWriter`] is in the response. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WriterState {
    /// Nothing written yet.
    StatusLine,
    /// The status line is out; the header section is next.
    Headers,
    /// The header section is out; body bytes or chunks may follow.
    Body,
    /// The last chunk is out; only trailers may follow.
    Trailers,
    /// The response is complete.
    Done,
}

/// Headers for a fixed-length plain text body of `content_len` bytes on a
/// connection that closes after the response.
pub fn default_headers(content_len: usize) -> Headers {
    let mut headers = Headers::new();
    headers.replace("Content-Length", content_len.to_string());
    headers.replace("Connection", "close");
    headers.replace("Content-Type", "text/plain");
    headers
}

/// Writes one response to a sink, rejecting writes made out of order.
///
/// A rejected write returns [`Error::WriterOrder`] and leaves the sink
/// untouched.
///
/// ```
/// # futures_lite::future::block_on(async {
/// use wire_h1::server::{default_headers, ResponseWriter, StatusCode};
///
/// let mut res = ResponseWriter::new(Vec::new());
/// res.write_status_line(StatusCode::Ok).await?;
/// res.write_headers(&default_headers(5)).await?;
/// res.write_body(b"hello").await?;
///
/// assert!(res.into_inner().starts_with(b"HTTP/1.1 200 OK\r\n"));
/// # wire_h1::Result::Ok(())
/// # }).unwrap();
/// ```
#[derive(Debug)]
pub struct ResponseWriter<W> {
    sink: W,
    state: WriterState,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Create a writer for a fresh response.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriterState::StatusLine,
        }
    }

    /// The current writer state.
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Get a reference to the sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Consume the writer, returning the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Write `HTTP/1.1 <code> <reason>\r\n`.
    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<()> {
        match self.state {
            WriterState::StatusLine => {}
            WriterState::Headers | WriterState::Body => {
                return Err(Error::WriterOrder(WriterOrderError::StatusLineWritten))
            }
            WriterState::Trailers | WriterState::Done => {
                return Err(Error::WriterOrder(WriterOrderError::Completed))
            }
        }

        let line = format!("HTTP/1.1 {}\r\n", status);
        trace!("> {}", line.trim_end());
        self.sink.write_all(line.as_bytes()).await?;
        self.state = WriterState::Headers;
        Ok(())
    }

    /// Write the whole header section, including the blank terminator line.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<()> {
        match self.state {
            WriterState::Headers => {}
            WriterState::StatusLine => {
                return Err(Error::WriterOrder(WriterOrderError::StatusLineFirst))
            }
            WriterState::Body => return Err(Error::WriterOrder(WriterOrderError::HeadersWritten)),
            WriterState::Trailers | WriterState::Done => {
                return Err(Error::WriterOrder(WriterOrderError::Completed))
            }
        }

        let mut buf = Vec::new();
        headers.encode_into(&mut buf);
        self.sink.write_all(&buf).await?;
        self.state = WriterState::Body;
        Ok(())
    }

    /// Write raw body bytes. May be called any number of times.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<()> {
        self.check_body()?;
        self.sink.write_all(body).await?;
        Ok(())
    }

    /// Write `payload` as one chunk of a chunked body, returning the payload
    /// length.
    ///
    /// An empty payload would read as the last chunk, so it writes nothing;
    /// end the body with [`write_chunked_body_done`](Self::write_chunked_body_done)
    /// or [`write_trailers`](Self::write_trailers).
    pub async fn write_chunked_body(&mut self, payload: &[u8]) -> Result<usize> {
        self.check_body()?;
        if payload.is_empty() {
            return Ok(0);
        }
        trace!("> chunk of {} bytes", payload.len());
        self.write_body(&encode_chunk(payload)).await?;
        Ok(payload.len())
    }

    /// Write the zero-length last chunk. Only trailers may follow.
    pub async fn write_chunked_body_done(&mut self) -> Result<()> {
        self.check_body()?;
        self.sink.write_all(LAST_CHUNK).await?;
        self.state = WriterState::Trailers;
        Ok(())
    }

    /// Write the trailer section that completes a chunked body, emitting the
    /// last chunk first if that has not happened yet.
    ///
    /// The trailer names should have been announced with a `Trailer` header
    /// alongside `Transfer-Encoding: chunked`; that is up to the caller.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<()> {
        match self.state {
            WriterState::Body => self.write_chunked_body_done().await?,
            WriterState::Trailers => {}
            WriterState::StatusLine => {
                return Err(Error::WriterOrder(WriterOrderError::StatusLineFirst))
            }
            WriterState::Headers => return Err(Error::WriterOrder(WriterOrderError::HeadersFirst)),
            WriterState::Done => return Err(Error::WriterOrder(WriterOrderError::Completed)),
        }

        let mut buf = Vec::new();
        trailers.encode_into(&mut buf);
        self.sink.write_all(&buf).await?;
        self.sink.flush().await?;
        self.state = WriterState::Done;
        Ok(())
    }

    /// Flush the sink.
    pub async fn flush(&mut self) -> Result<()> {
        self.sink.flush().await?;
        Ok(())
    }

    fn check_body(&self) -> Result<()> {
        match self.state {
            WriterState::Body => Ok(()),
            WriterState::StatusLine => Err(Error::WriterOrder(WriterOrderError::StatusLineFirst)),
            WriterState::Headers => Err(Error::WriterOrder(WriterOrderError::HeadersFirst)),
            WriterState::Trailers | WriterState::Done => {
                Err(Error::WriterOrder(WriterOrderError::Completed))
            }
        }
    }
}

/// Write a complete fixed-length response: status line, default headers and
/// `body`.
pub(crate) async fn write_simple<W>(sink: W, status: StatusCode, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut res = ResponseWriter::new(sink);
    res.write_status_line(status).await?;
    res.write_headers(&default_headers(body.len())).await?;
    res.write_body(body).await?;
    res.flush().await
}
