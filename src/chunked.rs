//! Chunked transfer-coding framing for response bodies.

use crate::headers::CRLF;

/// The zero-length chunk that ends a chunked body.
pub(crate) const LAST_CHUNK: &[u8] = b"0\r\n";

/// Frame `payload` as `<hex length>\r\n<payload>\r\n`.
pub(crate) fn encode_chunk(payload: &[u8]) -> Vec<u8> {
    let size = format!("{:x}", payload.len());
    let mut chunk = Vec::with_capacity(size.len() + payload.len() + 2 * CRLF.len());
    chunk.extend_from_slice(size.as_bytes());
    chunk.extend_from_slice(CRLF);
    chunk.extend_from_slice(payload);
    chunk.extend_from_slice(CRLF);
    chunk
}
