use crate::{Error, Result};

/// A growable read arena: bytes `..filled` hold data read from the transport
/// that the parser has not consumed yet.
#[derive(Debug)]
pub(crate) struct ReadBuffer {
    buf: Vec<u8>,
    filled: usize,
    limit: Option<usize>,
}

impl ReadBuffer {
    pub(crate) fn new(capacity: usize, limit: Option<usize>) -> Self {
        let capacity = match limit {
            Some(limit) => capacity.min(limit),
            None => capacity,
        };
        Self {
            buf: vec![0; capacity.max(1)],
            filled: 0,
            limit,
        }
    }

    pub(crate) fn filled(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The unfilled tail to read into. When the arena is full its capacity is
    /// doubled first, copying the unconsumed bytes over.
    pub(crate) fn spare_mut(&mut self) -> Result<&mut [u8]> {
        if self.filled == self.buf.len() {
            let mut new_len = self.buf.len() * 2;
            if let Some(limit) = self.limit {
                if self.buf.len() >= limit {
                    return Err(Error::BufferLimit(limit));
                }
                new_len = new_len.min(limit);
            }
            log::trace!("growing read buffer {} -> {}", self.buf.len(), new_len);
            let mut grown = vec![0; new_len];
            grown[..self.filled].copy_from_slice(&self.buf[..self.filled]);
            self.buf = grown;
        }
        Ok(&mut self.buf[self.filled..])
    }

    /// Mark `n` freshly read bytes as filled.
    pub(crate) fn advance(&mut self, n: usize) {
        debug_assert!(self.filled + n <= self.buf.len());
        self.filled += n;
    }

    /// Drop `n` parsed bytes from the front, shifting the rest left.
    pub(crate) fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.filled);
        self.buf.copy_within(n..self.filled, 0);
        self.filled -= n;
    }
}
