//! Length-prefixed, XDR-framed RPC message codec.
//!
//! One frame on the wire is a big-endian u32 total length (counting
//! itself), an XDR-encoded fixed-size header, and a payload that is either
//! XDR-encoded through a caller-supplied filter or raw bytes. Frames may
//! additionally carry a descriptor count, with the descriptors themselves
//! travelling out-of-band on the connection's ancillary channel.
//!
//! The codec owns everything between the dispatcher and the socket loop:
//! the in-memory [`Message`] record, incremental two-phase decoding (the
//! first four bytes say how much more to read), encoding with a
//! back-patched length prefix, attachment and lifecycle of passed file
//! descriptors, the transmit queue of pending outbound messages, and the
//! capture of the last error into a wire-representable record.
//!
//! Nothing here performs I/O or blocks: the I/O loop reads into and writes
//! from [`Message::pending_mut`]/[`Message::pending`], and codec calls are
//! pure in-memory work apart from bounded descriptor syscalls.

pub mod capture;
pub mod error;
pub mod frame;
pub mod header;
pub mod message;
pub mod payload;
pub mod queue;

pub use capture::{
    clear_last_error, last_error, set_last_error, ErrorCode, ErrorDomain, ErrorInfo, ErrorLevel,
    WireError,
};
pub use error::{CodecError, Result};
pub use frame::{
    FDS_MAX, HEADER_XDR_LEN, INITIAL_PAYLOAD_CAPACITY, LEN_SIZE, MIN_FRAME_SIZE, PAYLOAD_MAX,
};
pub use header::{MessageHeader, MessageStatus, MessageType};
pub use message::{Message, FD_SENTINEL};
pub use queue::MessageQueue;
