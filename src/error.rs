use std::fmt;
use std::io;

use thiserror::Error;

/// Errors when decoding requests and encoding responses.
#[derive(Debug, Error)]
pub enum Error {
    /// The request line had the wrong shape, an unknown method or an
    /// unsupported version.
    #[error("malformed request line: {0}")]
    MalformedRequestLine(String),

    /// A header line violated the field grammar.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// The `Content-Length` header was not a non-negative integer.
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    /// The stream ended before `Content-Length` body bytes arrived.
    #[error("body truncated: expected {expected} bytes, received {received}")]
    TruncatedBody {
        /// The declared body length.
        expected: usize,
        /// How many body bytes were received.
        received: usize,
    },

    /// The stream ended before the request head was complete.
    #[error("incomplete request: {0}")]
    Incomplete(&'static str),

    /// The parser was called again after the request was complete.
    #[error("trying to read data in a done state")]
    AlreadyDone,

    /// The read buffer would have to grow beyond the configured limit.
    #[error("request exceeds the buffer limit of {0} bytes")]
    BufferLimit(usize),

    /// The request was not received within the configured read timeout.
    #[error("timed out reading the request")]
    Timeout,

    /// A response write was attempted in the wrong writer state.
    #[error("incorrect order of response: {0}")]
    WriterOrder(WriterOrderError),

    /// The underlying transport failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether this error came from the transport rather than from the peer's
    /// bytes. Transport failures are never answered with a response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Timeout)
    }
}

/// What the response writer expected instead of the attempted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterOrderError {
    /// The status line has not been written yet.
    StatusLineFirst,
    /// The headers have not been written yet.
    HeadersFirst,
    /// The status line was already written.
    StatusLineWritten,
    /// The header section was already written.
    HeadersWritten,
    /// The response was already completed.
    Completed,
}

impl fmt::Display for WriterOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterOrderError::StatusLineFirst => f.write_str("first print status line"),
            WriterOrderError::HeadersFirst => f.write_str("first print headers"),
            WriterOrderError::StatusLineWritten => f.write_str("status line already printed"),
            WriterOrderError::HeadersWritten => f.write_str("headers already printed"),
            WriterOrderError::Completed => f.write_str("response already completed"),
        }
    }
}

/// A specialized `Result` for this crate.
pub type Result<T> = std::result::Result<T, Error>;
