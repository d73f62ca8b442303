//! Decode HTTP requests on the server.

use futures_lite::io::{AsyncRead, AsyncReadExt};
use log::trace;

use crate::headers::find_crlf;
use crate::request::{Method, Request, RequestLine};
use crate::server::buffer::ReadBuffer;
use crate::{Error, Headers, Result};

/// The only protocol version accepted in a request line.
const HTTP_VERSION: &str = "1.1";

/// Initial size of the read buffer; it doubles whenever it fills up.
const INITIAL_BUFFER_LEN: usize = 1024;

/// Where a [`RequestParser`] is in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Waiting for the request line.
    Initialized,
    /// Reading header lines.
    ParsingHeaders,
    /// Accumulating `Content-Length` body bytes.
    ParsingBody,
    /// The request is complete.
    Done,
}

/// An incremental request parser.
///
/// Feed it whatever bytes are available with [`parse`](Self::parse); it
/// reports how many it consumed so the caller can drop them and call again
/// with the remainder plus whatever arrives next.
#[derive(Debug)]
pub struct RequestParser {
    state: ParserState,
    line: Option<RequestLine>,
    headers: Headers,
    body: Vec<u8>,
    /// Bytes at the front of the pending input already known to hold no CRLF.
    scanned: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    /// Create a parser waiting for a request line.
    pub fn new() -> Self {
        Self {
            state: ParserState::Initialized,
            line: None,
            headers: Headers::new(),
            body: Vec::new(),
            scanned: 0,
        }
    }

    /// The current parser state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Whether a whole request has been parsed.
    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Run one parsing step against `data`, returning the number of bytes
    /// consumed. Zero means more input is needed.
    ///
    /// After a zero return the next call must pass the same bytes again,
    /// followed by whatever arrived since; the search for the end of the
    /// line resumes where it stopped.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize> {
        let state = self.state;
        match state {
            ParserState::Initialized | ParserState::ParsingHeaders if !self.has_line(data) => {
                Ok(0)
            }
            ParserState::Initialized => {
                let (consumed, line) = match parse_request_line(data)? {
                    Some(parsed) => parsed,
                    None => return Ok(0),
                };
                trace!("< {} {} HTTP/{}", line.method, line.target, line.version);
                self.line = Some(line);
                self.state = ParserState::ParsingHeaders;
                Ok(consumed)
            }
            ParserState::ParsingHeaders => {
                let (consumed, done) = self.headers.parse(data)?;
                if done {
                    self.state = match self.content_length()? {
                        Some(len) if len > 0 => ParserState::ParsingBody,
                        _ => ParserState::Done,
                    };
                    trace!("header section complete, now {:?}", self.state);
                }
                Ok(consumed)
            }
            ParserState::ParsingBody => {
                let expected = self.content_length()?.unwrap_or(0);
                let wanted = expected.saturating_sub(self.body.len());
                let take = wanted.min(data.len());
                self.body.extend_from_slice(&data[..take]);
                if self.body.len() == expected {
                    self.state = ParserState::Done;
                }
                Ok(take)
            }
            ParserState::Done => Err(Error::AlreadyDone),
        }
    }

    /// Check that the stream may end here, after all buffered bytes were
    /// offered to [`parse`](Self::parse).
    ///
    /// A stream that ends inside the header section yields the request as
    /// parsed so far, with an empty body. Ending before the request line or
    /// short of `Content-Length` body bytes is an error.
    pub fn finish(self) -> Result<Request> {
        match self.state {
            ParserState::Done => {}
            ParserState::Initialized => {
                return Err(Error::Incomplete("stream ended before a request line"))
            }
            ParserState::ParsingHeaders => {
                trace!("stream ended in the header section, keeping what was parsed");
            }
            ParserState::ParsingBody => {
                return Err(Error::TruncatedBody {
                    expected: self.content_length()?.unwrap_or(0),
                    received: self.body.len(),
                })
            }
        }

        let line = self
            .line
            .ok_or(Error::Incomplete("stream ended before a request line"))?;
        Ok(Request {
            line,
            headers: self.headers,
            body: self.body,
        })
    }

    fn has_line(&mut self, data: &[u8]) -> bool {
        let from = self.scanned.min(data.len());
        if find_crlf(&data[from..]).is_some() {
            self.scanned = 0;
            true
        } else {
            // A trailing CR may still be followed by its LF.
            self.scanned = data.len().saturating_sub(1);
            false
        }
    }

    fn content_length(&self) -> Result<Option<usize>> {
        match self.headers.get("content-length") {
            None => Ok(None),
            Some(value) => value
                .parse::<usize>()
                .map(Some)
                .map_err(|_| Error::InvalidContentLength(value.to_owned())),
        }
    }
}

/// Parse the request line at the front of `data`, if a whole line is there.
fn parse_request_line(data: &[u8]) -> Result<Option<(usize, RequestLine)>> {
    let line_len = match find_crlf(data) {
        Some(idx) => idx,
        None => return Ok(None),
    };

    let line = std::str::from_utf8(&data[..line_len])
        .map_err(|_| Error::MalformedRequestLine("request line is not valid UTF-8".to_owned()))?;

    let parts: Vec<&str> = line.split(' ').collect();
    let (method, target, version) = match parts.as_slice() {
        [method, target, version] => (*method, *target, *version),
        _ => {
            return Err(Error::MalformedRequestLine(format!(
                "expected 3 parts, got {}",
                parts.len()
            )))
        }
    };

    let method = method.parse::<Method>()?;

    match version.split_once('/') {
        Some(("HTTP", HTTP_VERSION)) => {}
        _ => {
            return Err(Error::MalformedRequestLine(format!(
                "invalid HTTP version, expected {}, got: {}",
                HTTP_VERSION, version
            )))
        }
    }

    let line = RequestLine {
        method,
        target: target.to_owned(),
        version: HTTP_VERSION.to_owned(),
    };
    Ok(Some((line_len + 2, line)))
}

/// Decode one HTTP request from `reader`.
///
/// Reads only as far as the end of the request; bytes after it are left
/// unread in the transport or discarded with the buffer.
pub async fn decode<R>(reader: R) -> Result<Request>
where
    R: AsyncRead + Unpin,
{
    decode_with_limit(reader, None).await
}

/// Decode one HTTP request, failing with [`Error::BufferLimit`] if the read
/// buffer would have to grow beyond `max_buffer_len` bytes.
pub async fn decode_with_limit<R>(mut reader: R, max_buffer_len: Option<usize>) -> Result<Request>
where
    R: AsyncRead + Unpin,
{
    let mut buf = ReadBuffer::new(INITIAL_BUFFER_LEN, max_buffer_len);
    let mut parser = RequestParser::new();

    while !parser.is_done() {
        let n = reader.read(buf.spare_mut()?).await?;
        if n == 0 {
            trace!("stream ended in {:?}", parser.state());
            drain(&mut parser, &mut buf)?;
            break;
        }
        buf.advance(n);
        drain(&mut parser, &mut buf)?;
    }

    parser.finish()
}

/// Run parse steps until one needs more input or the request is done.
fn drain(parser: &mut RequestParser, buf: &mut ReadBuffer) -> Result<()> {
    while !parser.is_done() {
        let consumed = parser.parse(buf.filled())?;
        if consumed == 0 {
            break;
        }
        buf.consume(consumed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(parser: &mut RequestParser, mut data: &[u8]) -> Result<()> {
        while !parser.is_done() {
            let n = parser.parse(data)?;
            if n == 0 {
                break;
            }
            data = &data[n..];
        }
        Ok(())
    }

    #[test]
    fn request_line_needs_crlf() {
        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(b"GET / HTTP/1.1").unwrap(), 0);
        assert_eq!(parser.state(), ParserState::Initialized);
        assert_eq!(parser.parse(b"GET / HTTP/1.1\r\n").unwrap(), 16);
        assert_eq!(parser.state(), ParserState::ParsingHeaders);
    }

    #[test]
    fn request_line_shape_is_checked() {
        let cases: [&[u8]; 6] = [
            b"/coffee HTTP/1.1\r\n",
            b"GET  / HTTP/1.1\r\n",
            b"GET / HTTP/1.1 extra\r\n",
            b"get / HTTP/1.1\r\n",
            b"GET / HTTP/1.0\r\n",
            b"GET / HTTPS/1.1\r\n",
        ];
        for case in cases.iter() {
            let mut parser = RequestParser::new();
            assert!(
                matches!(parser.parse(case), Err(Error::MalformedRequestLine(_))),
                "{:?}",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn every_method_is_accepted() {
        for method in ["GET", "HEAD", "POST", "OPTIONS", "PUT", "DELETE", "TRACE", "CONNECT"] {
            let mut parser = RequestParser::new();
            let line = format!("{} /x HTTP/1.1\r\n", method);
            parser.parse(line.as_bytes()).unwrap();
            assert_eq!(parser.line.as_ref().unwrap().method.as_str(), method);
        }
    }

    #[test]
    fn no_content_length_skips_body() {
        let mut parser = RequestParser::new();
        parse_all(&mut parser, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert!(parser.is_done());
        let req = parser.finish().unwrap();
        assert!(req.body().is_empty());
    }

    #[test]
    fn zero_content_length_skips_body() {
        let mut parser = RequestParser::new();
        parser.parse(b"POST / HTTP/1.1\r\n").unwrap();
        parser.parse(b"Content-Length: 0\r\n").unwrap();
        assert_eq!(parser.parse(b"\r\n").unwrap(), 2);
        assert_eq!(parser.state(), ParserState::Done);
    }

    #[test]
    fn body_is_accumulated_across_calls() {
        let mut parser = RequestParser::new();
        parse_all(&mut parser, b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\n").unwrap();
        assert_eq!(parser.state(), ParserState::ParsingBody);
        assert_eq!(parser.parse(b"he").unwrap(), 2);
        assert_eq!(parser.parse(b"llo, extra").unwrap(), 3);
        assert!(parser.is_done());
        assert_eq!(parser.finish().unwrap().body(), b"hello");
    }

    #[test]
    fn invalid_content_length() {
        for value in ["abc", "-5", "1.5"] {
            let mut parser = RequestParser::new();
            let head = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n", value);
            let err = parse_all(&mut parser, head.as_bytes()).unwrap_err();
            assert!(matches!(err, Error::InvalidContentLength(_)), "{}", value);
        }
    }

    #[test]
    fn parsing_after_done_fails() {
        let mut parser = RequestParser::new();
        parse_all(&mut parser, b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(matches!(parser.parse(b"more"), Err(Error::AlreadyDone)));
    }

    #[test]
    fn finish_reports_truncated_body() {
        let mut parser = RequestParser::new();
        parse_all(&mut parser, b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel").unwrap();
        assert!(matches!(
            parser.finish(),
            Err(Error::TruncatedBody {
                expected: 5,
                received: 3
            })
        ));
    }

    #[test]
    fn finish_rejects_missing_request_line() {
        assert!(matches!(
            RequestParser::new().finish(),
            Err(Error::Incomplete(_))
        ));
    }

    #[test]
    fn finish_keeps_a_partial_header_section() {
        let mut parser = RequestParser::new();
        parse_all(&mut parser, b"GET /x HTTP/1.1\r\nHost: x\r\nUser-Ag").unwrap();
        assert_eq!(parser.state(), ParserState::ParsingHeaders);

        let req = parser.finish().unwrap();
        assert_eq!(req.target(), "/x");
        assert_eq!(req.header("host"), Some("x"));
        assert_eq!(req.header("user-agent"), None);
        assert!(req.body().is_empty());
    }

    #[test]
    fn line_search_resumes_after_a_short_read() {
        let data = b"GET / HTTP/1.1\r\n";
        let mut parser = RequestParser::new();
        for end in 1..data.len() {
            assert_eq!(parser.parse(&data[..end]).unwrap(), 0);
            assert_eq!(parser.scanned, end - 1);
        }
        assert_eq!(parser.parse(data).unwrap(), data.len());
        assert_eq!(parser.scanned, 0);

        assert_eq!(parser.parse(b"Host: x\r").unwrap(), 0);
        assert_eq!(parser.parse(b"Host: x\r\n").unwrap(), 9);
        assert_eq!(parser.headers.get("host"), Some("x"));
    }
}
