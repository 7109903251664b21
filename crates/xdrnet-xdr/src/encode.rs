use crate::error::{Result, XdrError};
use crate::pad_len;

const PADDING: [u8; 4] = [0; 4];

/// Encodes XDR items into a fixed destination buffer.
///
/// All writes are big-endian. The encoder never grows the destination;
/// when an item does not fit it fails with [`XdrError::BufferTooSmall`]
/// without consuming any space, so the caller can reallocate and retry.
pub struct XdrEncoder<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> XdrEncoder<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left in the destination.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Rewind (or advance) the write position, e.g. to back-patch a length
    /// word written earlier. The position must stay within the destination.
    pub fn set_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(XdrError::BufferTooSmall {
                needed: pos,
                available: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(XdrError::BufferTooSmall {
                needed: bytes.len(),
                available: self.remaining(),
            });
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    pub fn encode_u32(&mut self, v: u32) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    pub fn encode_i32(&mut self, v: i32) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    pub fn encode_u64(&mut self, v: u64) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    pub fn encode_i64(&mut self, v: i64) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    /// Booleans are a full XDR word: 0 or 1.
    pub fn encode_bool(&mut self, v: bool) -> Result<()> {
        self.encode_u32(v as u32)
    }

    /// Fixed-length opaque data: raw bytes plus zero padding, no length word.
    pub fn encode_opaque_fixed(&mut self, data: &[u8]) -> Result<()> {
        let pad = pad_len(data.len());
        if data.len() + pad > self.remaining() {
            return Err(XdrError::BufferTooSmall {
                needed: data.len() + pad,
                available: self.remaining(),
            });
        }
        self.put(data)?;
        self.put(&PADDING[..pad])
    }

    /// Variable-length opaque data: a u32 length word, then the bytes, then
    /// zero padding.
    pub fn encode_opaque(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > u32::MAX as usize {
            return Err(XdrError::LengthOverflow(data.len()));
        }
        let pad = pad_len(data.len());
        if 4 + data.len() + pad > self.remaining() {
            return Err(XdrError::BufferTooSmall {
                needed: 4 + data.len() + pad,
                available: self.remaining(),
            });
        }
        self.encode_u32(data.len() as u32)?;
        self.put(data)?;
        self.put(&PADDING[..pad])
    }

    /// Strings are encoded as variable-length opaque UTF-8 bytes.
    pub fn encode_string(&mut self, s: &str) -> Result<()> {
        self.encode_opaque(s.as_bytes())
    }
}
