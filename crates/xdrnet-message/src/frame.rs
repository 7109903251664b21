use tracing::debug;
use xdrnet_xdr::{XdrDecoder, XdrEncoder};

use crate::error::{CodecError, Result};
use crate::header::MessageHeader;
use crate::message::Message;

/// Size of the length prefix: one big-endian u32 holding the total frame
/// size, itself included.
pub const LEN_SIZE: usize = 4;

/// Marshalled size of [`MessageHeader`]: six XDR words.
pub const HEADER_XDR_LEN: usize = 24;

/// Maximum size of the post-length portion of a frame (header + payload).
pub const PAYLOAD_MAX: usize = 256 * 1024 * 1024;

/// Starting payload capacity for outbound messages; the encoder grows from
/// here when a payload does not fit.
pub const INITIAL_PAYLOAD_CAPACITY: usize = 64 * 1024;

/// Maximum number of descriptors attached to one message.
pub const FDS_MAX: usize = 32;

/// Smallest well-formed frame: length prefix plus a bare header.
pub const MIN_FRAME_SIZE: usize = LEN_SIZE + HEADER_XDR_LEN;

/// Wire format of one frame:
///
/// ```text
/// ┌────────────────┬────────────────────┬─────────────────────────────┐
/// │ Length (4B BE) │ Header (24B XDR)   │ Payload (XDR or raw bytes)  │
/// │ total size L,  │ prog, vers, proc,  │ optionally preceded by a    │
/// │ incl. these 4B │ type, serial, stat │ u32 descriptor count        │
/// └────────────────┴────────────────────┴─────────────────────────────┘
/// ```
///
/// Descriptors themselves travel out-of-band on the connection's ancillary
/// channel and are not part of `L`.
impl Message {
    /// Decode the length prefix of an inbound frame.
    ///
    /// Expects the buffer to hold exactly the [`LEN_SIZE`] prefix bytes
    /// (see [`Message::begin_length_read`]). On success the buffer is grown
    /// to the full frame size, `length` is the total size to read, and
    /// `offset` sits past the length word; the I/O loop reads the remaining
    /// `length - offset` bytes into [`Message::pending_mut`].
    pub fn decode_length(&mut self) -> Result<()> {
        let mut dec = XdrDecoder::new(&self.buffer[..self.length]);
        let total = dec
            .decode_u32()
            .map_err(|e| CodecError::Protocol(format!("unable to decode frame length: {e}")))?
            as usize;
        self.offset = dec.pos();

        if total < LEN_SIZE {
            return Err(CodecError::Protocol(format!(
                "frame of {total} bytes is too small to carry its length prefix"
            )));
        }

        // The prefix counts itself; the rest of the frame remains to read.
        let rest = total - LEN_SIZE;
        if rest > PAYLOAD_MAX {
            return Err(CodecError::Protocol(format!(
                "frame of {total} bytes exceeds the {PAYLOAD_MAX} byte limit"
            )));
        }

        self.length += rest;
        self.buffer.resize(self.length, 0);
        debug!(length = self.length, rest, "got frame length");
        Ok(())
    }

    /// Decode the header of a complete inbound frame.
    ///
    /// Expects `length` to cover the whole frame. Leaves `offset` at the
    /// first payload byte. Header fields are stored as decoded; their
    /// logical validity is checked by higher layers, not here.
    pub fn decode_header(&mut self) -> Result<()> {
        if self.length < LEN_SIZE {
            return Err(CodecError::Protocol(
                "header cannot be decoded before the frame length".into(),
            ));
        }

        self.offset = LEN_SIZE;

        let mut dec = XdrDecoder::new(&self.buffer[self.offset..self.length]);
        self.header = MessageHeader::xdr_decode(&mut dec)
            .map_err(|e| CodecError::Protocol(format!("unable to decode message header: {e}")))?;
        self.offset += dec.pos();
        Ok(())
    }

    /// Encode the length placeholder and header of an outbound message.
    ///
    /// Allocates the initial buffer, writes a zero length word (back-patched
    /// by payload finalisation), then the header. Leaves `offset` at the
    /// first payload byte; `length` is the allocated capacity, which only
    /// converges with the written size when the payload is finalised.
    pub fn encode_header(&mut self) -> Result<()> {
        self.length = INITIAL_PAYLOAD_CAPACITY + LEN_SIZE;
        self.buffer.resize(self.length, 0);
        self.offset = 0;

        let mut enc = XdrEncoder::new(&mut self.buffer[..self.length]);
        enc.encode_u32(0)
            .map_err(|e| CodecError::Protocol(format!("unable to encode frame length: {e}")))?;
        self.header
            .xdr_encode(&mut enc)
            .map_err(|e| CodecError::Protocol(format!("unable to encode message header: {e}")))?;

        // Fill in the current length; payload encoding re-patches it later.
        let written = enc.pos();
        enc.set_pos(0)
            .and_then(|()| enc.encode_u32(written as u32))
            .map_err(|e| CodecError::Protocol(format!("unable to re-encode frame length: {e}")))?;

        self.offset = written;
        Ok(())
    }

    /// Double the payload capacity, preserving content up to `offset`.
    /// Fails once the capacity would exceed [`PAYLOAD_MAX`].
    pub(crate) fn grow_payload(&mut self) -> Result<()> {
        let grown = (self.length - LEN_SIZE) * 2;
        if grown > PAYLOAD_MAX {
            return Err(CodecError::PayloadTooLarge {
                need: grown,
                max: PAYLOAD_MAX,
            });
        }
        self.length = grown + LEN_SIZE;
        self.buffer.resize(self.length, 0);
        debug!(length = self.length, "grew message buffer");
        Ok(())
    }
}
