/// Errors surfaced at the codec boundary.
///
/// None of these are retried internally (the encode growth loop aside).
/// After any error inside an encode/decode the message's cursors are in an
/// unspecified but safe-to-drop state; callers should discard the message
/// rather than attempt to recover it.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A frame, header, or payload failed to parse or serialise.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An encode would exceed the maximum payload size.
    #[error("payload too large ({need} bytes needed, {max} bytes available)")]
    PayloadTooLarge { need: usize, max: usize },

    /// The descriptor count exceeds the per-message limit.
    #[error("too many file descriptors ({count}, maximum {max})")]
    TooManyFds { count: usize, max: usize },

    /// A descriptor slot index is out of range.
    #[error("no file descriptor at slot {slot} (message has {nfds})")]
    NoSuchSlot { slot: usize, nfds: usize },

    /// An OS-level failure duplicating or configuring a descriptor.
    #[error("system error: {0}")]
    System(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
