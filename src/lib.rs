//! HTTP/1.1 request parsing and response writing over raw byte streams.
//!
//! A server decodes requests and encodes responses. This crate does both by
//! hand on top of any async duplex stream, one request per connection:
//!
//! ```txt
//!            bytes in                               bytes out
//! transport ---------> RequestParser -> Request        ^
//!                                          |           |
//!                                          v           |
//!                                       handler -> ResponseWriter
//! ```
//!
//! - [`Headers::parse`] parses one header line at a time.
//! - [`server::RequestParser`] turns arbitrarily fragmented input into a
//!   [`Request`]; [`server::decode`] drives it from a reader.
//! - [`server::ResponseWriter`] writes the status line, headers, body and
//!   optional chunked trailers, refusing to write them out of order.
//! - [`server::accept`] wires both together for one connection and
//!   [`server::Server`] does so for every connection a TCP listener accepts.
//!
//! # Example
//!
//! ```no_run
//! use wire_h1::server::{self, default_headers, StatusCode};
//!
//! # fn main() -> std::io::Result<()> {
//! let server = server::Server::serve("127.0.0.1:42069", |mut res, req| async move {
//!     let body = format!("you asked for {}\n", req.target());
//!     let _ = res.write_status_line(StatusCode::Ok).await;
//!     let _ = res.write_headers(&default_headers(body.len())).await;
//!     let _ = res.write_body(body.as_bytes()).await;
//! })?;
//! # drop(server);
//! # Ok(()) }
//! ```

#![forbid(unsafe_code)]
#![deny(future_incompatible, rust_2018_idioms)]
#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

pub use duplex::Duplex;
pub use error::{Error, Result, WriterOrderError};
pub use headers::Headers;
pub use request::{Method, Request, RequestLine};

mod chunked;
mod duplex;
mod error;
mod headers;
mod request;

pub mod server;
