/// Errors that can occur during XDR encoding/decoding.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum XdrError {
    /// The destination buffer cannot hold the next item.
    #[error("destination buffer too small ({needed} bytes needed, {available} available)")]
    BufferTooSmall { needed: usize, available: usize },

    /// The input ended before the next item was complete.
    #[error("unexpected end of XDR input ({needed} bytes needed, {available} available)")]
    UnexpectedEof { needed: usize, available: usize },

    /// The input held a well-framed but malformed item.
    #[error("invalid XDR item: {0}")]
    InvalidValue(&'static str),

    /// An item length does not fit in the 32-bit XDR length word.
    #[error("length {0} exceeds the XDR 32-bit limit")]
    LengthOverflow(usize),
}

pub type Result<T> = std::result::Result<T, XdrError>;
