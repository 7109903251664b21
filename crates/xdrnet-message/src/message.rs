use std::os::fd::{FromRawFd, IntoRawFd, OwnedFd, RawFd};

use bytes::BytesMut;
use tracing::debug;
use xdrnet_xdr::{XdrDecoder, XdrEncoder};

use crate::error::{CodecError, Result};
use crate::frame::{FDS_MAX, LEN_SIZE};
use crate::header::MessageHeader;

/// Sentinel marking a descriptor slot that is empty or already handed off.
pub const FD_SENTINEL: RawFd = -1;

/// Hook fired exactly once when a message is dropped, before its
/// descriptors are closed (so the hook may reclaim them).
pub type ReleaseHook = Box<dyn FnOnce(&mut Message) + Send>;

/// One RPC message: header, wire buffer, attached descriptors, and the
/// bookkeeping the frame/payload codecs and the I/O loop share.
///
/// The buffer carries two cursors. `length` is the declared size (bytes
/// allocated and in use) and `offset` is the next read or write position;
/// `offset <= length` holds at every operation boundary, but what each
/// cursor means changes per phase and is restated on each codec operation.
///
/// A message is single-owner: it moves between the I/O loop, dispatcher,
/// and transmit queue as a `Box<Message>`, never by shared mutation.
pub struct Message {
    pub header: MessageHeader,
    pub(crate) buffer: BytesMut,
    pub(crate) length: usize,
    pub(crate) offset: usize,
    fds: Vec<RawFd>,
    donefds: usize,
    tracked: bool,
    release: Option<ReleaseHook>,
    pub(crate) next: Option<Box<Message>>,
}

impl Message {
    /// Allocate an empty message. `tracked` marks participation in
    /// higher-layer serial-number tracking and survives [`Message::clear`].
    pub fn new(tracked: bool) -> Box<Message> {
        debug!(tracked, "new message");
        Box::new(Message {
            header: MessageHeader::default(),
            buffer: BytesMut::new(),
            length: 0,
            offset: 0,
            fds: Vec::new(),
            donefds: 0,
            tracked,
            release: None,
            next: None,
        })
    }

    pub fn tracked(&self) -> bool {
        self.tracked
    }

    /// Declared buffer size. During encode this is the allocated capacity
    /// until finalisation, after which it is the frame size; during decode
    /// it is the total frame size learned from the length prefix.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Next read or write position within the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The declared buffer contents.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer[..self.length]
    }

    /// The unread (inbound) or unsent (outbound) region, `offset..length`.
    pub fn pending(&self) -> &[u8] {
        &self.buffer[self.offset..self.length]
    }

    /// Mutable view of the pending region, for the I/O loop to fill.
    pub fn pending_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[self.offset..self.length]
    }

    /// Record that the I/O loop consumed or produced `n` pending bytes.
    pub fn advance(&mut self, n: usize) {
        assert!(
            self.offset + n <= self.length,
            "advance past declared buffer length"
        );
        self.offset += n;
    }

    /// Size the buffer for the fixed-length prefix read that starts a new
    /// inbound frame. The next step is reading [`LEN_SIZE`] bytes into
    /// [`Message::pending_mut`], then [`Message::decode_length`].
    pub fn begin_length_read(&mut self) {
        self.buffer.resize(LEN_SIZE, 0);
        self.length = LEN_SIZE;
        self.offset = 0;
    }

    /// Register the hook to fire when this message is dropped. At most one
    /// hook fires per message; a later call replaces an unfired hook.
    pub fn set_release(&mut self, hook: impl FnOnce(&mut Message) + Send + 'static) {
        self.release = Some(Box::new(hook));
    }

    /// Close every attached descriptor and release the slot array.
    pub fn clear_fds(&mut self) {
        for fd in self.fds.drain(..) {
            force_close(fd);
        }
        self.donefds = 0;
    }

    /// Release descriptors and the buffer, zeroing both cursors.
    pub fn clear_payload(&mut self) {
        self.clear_fds();
        self.offset = 0;
        self.length = 0;
        self.buffer = BytesMut::new();
    }

    /// Reset the whole record for reuse, preserving only the tracked flag.
    /// The release hook is discarded without firing; clearing is for reuse,
    /// not disposal.
    pub fn clear(&mut self) {
        debug!(nfds = self.fds.len(), "clearing message");
        self.clear_payload();
        self.header = MessageHeader::default();
        self.release = None;
        self.next = None;
    }

    // --- descriptor attachment -------------------------------------------

    /// Number of descriptor slots (attached or expected).
    pub fn nfds(&self) -> usize {
        self.fds.len()
    }

    /// How many descriptors the I/O loop has already handed off.
    pub fn done_fds(&self) -> usize {
        self.donefds
    }

    /// Record one more descriptor as handed off.
    pub fn advance_done_fds(&mut self) {
        assert!(self.donefds < self.fds.len(), "no descriptors left to hand off");
        self.donefds += 1;
    }

    /// Duplicate `fd` with close-on-exec and append it to the message.
    /// The message owns the duplicate from here on; the caller keeps `fd`.
    /// On failure the duplicate is closed and the message is unchanged.
    pub fn add_fd(&mut self, fd: RawFd) -> Result<()> {
        let dup = dup_cloexec(fd)?;
        self.fds.push(dup.into_raw_fd());
        Ok(())
    }

    /// Duplicate the descriptor at `slot` with close-on-exec and return it;
    /// the caller owns the duplicate.
    pub fn dup_fd(&self, slot: usize) -> Result<OwnedFd> {
        if slot >= self.fds.len() {
            return Err(CodecError::NoSuchSlot {
                slot,
                nfds: self.fds.len(),
            });
        }
        dup_cloexec(self.fds[slot])
    }

    /// Store a descriptor received from the ancillary channel into `slot`,
    /// transferring ownership to the message. Any descriptor previously in
    /// the slot is closed.
    pub fn put_fd(&mut self, slot: usize, fd: OwnedFd) -> Result<()> {
        if slot >= self.fds.len() {
            return Err(CodecError::NoSuchSlot {
                slot,
                nfds: self.fds.len(),
            });
        }
        let prev = std::mem::replace(&mut self.fds[slot], fd.into_raw_fd());
        force_close(prev);
        Ok(())
    }

    /// Hand the descriptor at `slot` to the caller, leaving the sentinel
    /// behind; the message is no longer responsible for closing it.
    pub fn take_fd(&mut self, slot: usize) -> Result<RawFd> {
        if slot >= self.fds.len() {
            return Err(CodecError::NoSuchSlot {
                slot,
                nfds: self.fds.len(),
            });
        }
        Ok(std::mem::replace(&mut self.fds[slot], FD_SENTINEL))
    }

    /// Raw view of the descriptor at `slot`, without any ownership change.
    pub fn fd_at(&self, slot: usize) -> Result<RawFd> {
        if slot >= self.fds.len() {
            return Err(CodecError::NoSuchSlot {
                slot,
                nfds: self.fds.len(),
            });
        }
        Ok(self.fds[slot])
    }

    /// Append the descriptor count as an XDR u32 at the current cursor.
    pub fn encode_num_fds(&mut self) -> Result<()> {
        let count = self.fds.len();
        if count > FDS_MAX {
            return Err(CodecError::TooManyFds {
                count,
                max: FDS_MAX,
            });
        }
        let mut enc = XdrEncoder::new(&mut self.buffer[self.offset..self.length]);
        enc.encode_u32(count as u32)
            .map_err(|e| CodecError::Protocol(format!("unable to encode descriptor count: {e}")))?;
        self.offset += enc.pos();
        debug!(count, "sending descriptors with frame");
        Ok(())
    }

    /// Decode the descriptor count at the current cursor. Allocates `count`
    /// sentinel slots for the ancillary receives to fill, unless slots were
    /// already populated by the I/O layer, in which case those are kept.
    pub fn decode_num_fds(&mut self) -> Result<usize> {
        let mut dec = XdrDecoder::new(&self.buffer[self.offset..self.length]);
        let count = dec
            .decode_u32()
            .map_err(|e| CodecError::Protocol(format!("unable to decode descriptor count: {e}")))?
            as usize;
        self.offset += dec.pos();

        if count > FDS_MAX {
            return Err(CodecError::TooManyFds {
                count,
                max: FDS_MAX,
            });
        }

        if self.fds.is_empty() {
            self.fds = vec![FD_SENTINEL; count];
        }
        debug!(count, "expecting descriptors with frame");
        Ok(count)
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        debug!(
            nfds = self.fds.len(),
            has_release = self.release.is_some(),
            "freeing message"
        );
        if let Some(hook) = self.release.take() {
            hook(self);
        }
        self.clear_payload();
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("header", &self.header)
            .field("length", &self.length)
            .field("offset", &self.offset)
            .field("nfds", &self.fds.len())
            .field("donefds", &self.donefds)
            .field("tracked", &self.tracked)
            .finish_non_exhaustive()
    }
}

/// Duplicate a descriptor, atomically acquiring close-on-exec.
fn dup_cloexec(fd: RawFd) -> Result<OwnedFd> {
    // SAFETY: fcntl with F_DUPFD_CLOEXEC allocates a fresh descriptor and
    // does not touch memory; the new descriptor is immediately wrapped so
    // it cannot leak past an early return.
    let newfd = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) };
    if newfd < 0 {
        return Err(CodecError::System(std::io::Error::last_os_error()));
    }
    // SAFETY: newfd was just returned by fcntl and is owned by no one else.
    Ok(unsafe { OwnedFd::from_raw_fd(newfd) })
}

/// Close a descriptor, discarding the result. On Linux the descriptor is
/// released even when close(2) reports EINTR, so there is nothing to retry.
fn force_close(fd: RawFd) {
    if fd < 0 {
        return;
    }
    // SAFETY: fd is a descriptor this message owns; no other holder remains.
    unsafe {
        libc::close(fd);
    }
}
