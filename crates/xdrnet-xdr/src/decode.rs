use crate::error::{Result, XdrError};
use crate::pad_len;

/// Decodes XDR items from a borrowed input buffer.
///
/// Mirror of [`crate::XdrEncoder`]: big-endian reads with explicit position
/// tracking. Truncated input fails with [`XdrError::UnexpectedEof`];
/// well-framed but malformed items (bad bool discriminant, non-zero
/// padding, non-UTF-8 strings) fail with [`XdrError::InvalidValue`].
pub struct XdrDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> XdrDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left in the input.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(XdrError::UnexpectedEof {
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn take_padding(&mut self, len: usize) -> Result<()> {
        let pad = self.take(pad_len(len))?;
        if pad.iter().any(|&b| b != 0) {
            return Err(XdrError::InvalidValue("non-zero padding"));
        }
        Ok(())
    }

    pub fn decode_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn decode_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn decode_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn decode_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn decode_bool(&mut self) -> Result<bool> {
        match self.decode_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(XdrError::InvalidValue("bool discriminant")),
        }
    }

    /// Fixed-length opaque data: `len` raw bytes, then zero padding.
    pub fn decode_opaque_fixed(&mut self, len: usize) -> Result<&'a [u8]> {
        let data = self.take(len)?;
        self.take_padding(len)?;
        Ok(data)
    }

    /// Variable-length opaque data: a u32 length word, then the bytes, then
    /// zero padding. Returns a slice borrowed from the input.
    pub fn decode_opaque(&mut self) -> Result<&'a [u8]> {
        let len = self.decode_u32()? as usize;
        self.decode_opaque_fixed(len)
    }

    pub fn decode_string(&mut self) -> Result<String> {
        let bytes = self.decode_opaque()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| XdrError::InvalidValue("string is not valid UTF-8"))
    }
}
