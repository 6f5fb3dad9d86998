use std::collections::VecDeque;

use bytes::{Buf, Bytes, BytesMut};

use crate::error::WireError;

/// Append-only store for chunks arriving from a byte source.
///
/// Chunks are kept as they arrived; nothing is copied on `push`. A read
/// that falls inside the front chunk is a zero-copy slice of it, a read
/// spanning several chunks is gathered into one fresh buffer.
///
/// ```text
///   push(b"\x01\x02")  push(b"\x03")  push(b"\x04\x05\x06")
///   ┌─────────┐        ┌────┐         ┌──────────────┐
///   │ 01 02   │        │ 03 │         │ 04 05 06     │   ready = 6
///   └─────────┘        └────┘         └──────────────┘
///   slice(3) → 01 02 03 (copied, spans two chunks)
///   seek(3)  → front is now 04 05 06, ready = 3
/// ```
#[derive(Debug, Default)]
pub struct ByteAccumulator {
    chunks: VecDeque<Bytes>,
    ready: usize,
    consumed: usize,
}

impl ByteAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks are ignored.
    pub fn push(&mut self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return;
        }
        self.ready += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Count of unconsumed bytes available to read.
    #[must_use]
    pub fn ready(&self) -> usize {
        self.ready
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ready == 0
    }

    /// Total bytes consumed by [`seek`](Self::seek) since creation.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Peek at the next `n` ready bytes without consuming them.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InsufficientData`] if `n` exceeds
    /// [`ready`](Self::ready).
    pub fn slice(&self, n: usize) -> Result<Bytes, WireError> {
        if n > self.ready {
            return Err(WireError::InsufficientData {
                requested: n,
                ready: self.ready,
            });
        }
        if n == 0 {
            return Ok(Bytes::new());
        }

        if let Some(front) = self.chunks.front()
            && front.len() >= n
        {
            return Ok(front.slice(..n));
        }

        let mut out = BytesMut::with_capacity(n);
        for chunk in &self.chunks {
            let wanted = n - out.len();
            if wanted == 0 {
                break;
            }
            let take = wanted.min(chunk.len());
            out.extend_from_slice(&chunk[..take]);
        }
        Ok(out.freeze())
    }

    /// Consume `n` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InsufficientData`] if `n` exceeds
    /// [`ready`](Self::ready). Nothing is consumed in that case.
    pub fn seek(&mut self, n: usize) -> Result<(), WireError> {
        if n > self.ready {
            return Err(WireError::InsufficientData {
                requested: n,
                ready: self.ready,
            });
        }

        let mut remaining = n;
        while remaining > 0 {
            let Some(front) = self.chunks.front_mut() else {
                break;
            };
            if front.len() <= remaining {
                remaining -= front.len();
                self.chunks.pop_front();
            } else {
                front.advance(remaining);
                remaining = 0;
            }
        }

        self.ready -= n;
        self.consumed += n;
        Ok(())
    }

    /// [`slice`](Self::slice) then [`seek`](Self::seek).
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InsufficientData`] if `n` exceeds
    /// [`ready`](Self::ready).
    pub fn take(&mut self, n: usize) -> Result<Bytes, WireError> {
        let bytes = self.slice(n)?;
        self.seek(n)?;
        Ok(bytes)
    }
}
