//! XDR (External Data Representation, RFC 4506) primitives over fixed buffers.
//!
//! Every item is big-endian and occupies a multiple of 4 bytes, zero-padded
//! as needed. Both streams track their position explicitly, and the encoder
//! allows the position to be rewound so a caller can back-patch a value
//! written earlier (the message codec uses this for its length prefix).
//!
//! Encoding never allocates: the encoder writes into a caller-provided
//! `&mut [u8]` and fails with [`XdrError::BufferTooSmall`] when the
//! destination cannot hold the next item, which callers treat as a signal
//! to grow the destination and retry.

pub mod decode;
pub mod encode;
pub mod error;

pub use decode::XdrDecoder;
pub use encode::XdrEncoder;
pub use error::{Result, XdrError};

/// Bytes of zero padding needed to round `len` up to a 4-byte boundary.
pub(crate) const fn pad_len(len: usize) -> usize {
    (4 - len % 4) % 4
}
