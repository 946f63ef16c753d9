//! Budgeted primitive reads.
//!
//! A [`Frame`] wraps the caller's [`Buf`] together with the number of bytes
//! the current message may still consume. Every read checks the budget
//! before touching the stream, so a frame never reads past its end.

use crate::error::DecodeError;
use bytes::{Buf, Bytes};

/// Varints are at most 10 bytes for a 64-bit value
pub const MAX_VARINT_LEN: usize = 10;

/// Decode a base-128 varint, reading at most `limit` bytes.
///
/// Returns the value and the number of bytes consumed. The first byte on the
/// wire carries the least significant seven bits.
pub fn decode_varint<B: Buf>(buf: &mut B, limit: usize) -> Result<(u64, usize), DecodeError> {
    let mut result: u64 = 0;

    for i in 0..MAX_VARINT_LEN {
        if i >= limit {
            return Err(DecodeError::budget(i + 1, limit));
        }
        if !buf.has_remaining() {
            return Err(DecodeError::truncated("varint"));
        }

        let byte = buf.get_u8();
        result |= u64::from(byte & 0x7F) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(DecodeError::VarintOverflow)
}

/// The stream window one message decode may consume
pub(crate) struct Frame<'b, B> {
    buf: &'b mut B,
    budget: usize,
    consumed: usize,
}

impl<'b, B: Buf> Frame<'b, B> {
    pub(crate) fn new(buf: &'b mut B, budget: usize) -> Self {
        Self {
            buf,
            budget,
            consumed: 0,
        }
    }

    /// Bytes this frame has read so far
    pub(crate) fn consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes this frame may still read
    pub(crate) fn remaining(&self) -> usize {
        self.budget - self.consumed
    }

    /// Budget spent or stream exhausted
    pub(crate) fn is_done(&self) -> bool {
        self.remaining() == 0 || !self.buf.has_remaining()
    }

    fn reserve(&self, n: usize, context: &'static str) -> Result<(), DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::budget(n, self.remaining()));
        }
        if self.buf.remaining() < n {
            return Err(DecodeError::truncated(context));
        }
        Ok(())
    }

    pub(crate) fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let limit = self.remaining();
        let (value, len) = decode_varint(&mut *self.buf, limit)?;
        self.consumed += len;
        Ok(value)
    }

    pub(crate) fn read_u8(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        self.reserve(1, context)?;
        self.consumed += 1;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        self.reserve(8, "64-bit value")?;
        self.consumed += 8;
        Ok(self.buf.get_u64_le())
    }

    pub(crate) fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        self.reserve(4, "32-bit value")?;
        self.consumed += 4;
        Ok(self.buf.get_u32_le())
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        self.reserve(len, "length-delimited value")?;
        self.consumed += len;
        Ok(self.buf.copy_to_bytes(len))
    }

    /// Runs `f` on a child frame of `len` bytes carved out of this one.
    ///
    /// Whatever the child consumed is charged to this frame, whether or not
    /// `f` succeeded.
    pub(crate) fn nested<T>(
        &mut self,
        len: usize,
        f: impl FnOnce(&mut Frame<'_, B>) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::budget(len, self.remaining()));
        }

        let mut child = Frame::new(&mut *self.buf, len);
        let result = f(&mut child);
        self.consumed += child.consumed;
        result
    }
}
