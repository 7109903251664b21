use tracing::debug;
use xdrnet_xdr::{XdrDecoder, XdrEncoder, XdrError};

use crate::error::{CodecError, Result};
use crate::frame::{LEN_SIZE, PAYLOAD_MAX};
use crate::message::Message;

impl Message {
    /// Serialise a typed payload through `filter`, growing the buffer as
    /// needed, then finalise the frame.
    ///
    /// Assumes [`Message::encode_header`] has run, so the payload appends at
    /// the current cursor. Every filter failure is treated as "destination
    /// too small": the payload capacity doubles and the filter reruns from
    /// scratch, until either it succeeds or growth hits [`PAYLOAD_MAX`].
    pub fn encode_payload<T, F>(&mut self, mut filter: F, value: &T) -> Result<()>
    where
        F: FnMut(&mut XdrEncoder<'_>, &T) -> std::result::Result<(), XdrError>,
    {
        loop {
            let written = {
                let mut enc = XdrEncoder::new(&mut self.buffer[self.offset..self.length]);
                match filter(&mut enc, value) {
                    Ok(()) => Some(enc.pos()),
                    Err(_) => None,
                }
            };
            match written {
                Some(n) => {
                    self.offset += n;
                    break;
                }
                None => self.grow_payload()?,
            }
        }

        self.finish_payload()
    }

    /// Append raw bytes verbatim as the payload, then finalise the frame.
    ///
    /// Assumes [`Message::encode_header`] has run. An empty `data` appends
    /// nothing; this is how a header-only frame is finalised.
    pub fn encode_payload_raw(&mut self, data: &[u8]) -> Result<()> {
        if !data.is_empty() {
            if self.length - self.offset < data.len() {
                if self.offset + data.len() > PAYLOAD_MAX + LEN_SIZE {
                    return Err(CodecError::PayloadTooLarge {
                        need: self.offset + data.len(),
                        max: PAYLOAD_MAX + LEN_SIZE,
                    });
                }
                self.length = self.offset + data.len();
                self.buffer.resize(self.length, 0);
                debug!(length = self.length, "grew message buffer");
            }
            self.buffer[self.offset..self.offset + data.len()].copy_from_slice(data);
            self.offset += data.len();
        }

        self.finish_payload()
    }

    /// Deserialise a typed payload through `filter`.
    ///
    /// Assumes [`Message::decode_header`] has run, so the cursor points at
    /// the first payload byte. Advances the cursor by the bytes consumed.
    pub fn decode_payload<T, F>(&mut self, mut filter: F) -> Result<T>
    where
        F: FnMut(&mut XdrDecoder<'_>) -> std::result::Result<T, XdrError>,
    {
        let mut dec = XdrDecoder::new(&self.buffer[self.offset..self.length]);
        let value = filter(&mut dec)
            .map_err(|e| CodecError::Protocol(format!("unable to decode message payload: {e}")))?;
        self.offset += dec.pos();
        Ok(value)
    }

    /// Back-patch the length prefix to the written size and flip the
    /// cursors for transmission: `length` becomes the frame size and
    /// `offset` rewinds to the first byte to send.
    fn finish_payload(&mut self) -> Result<()> {
        debug!(length = self.offset, "encoding frame length");
        let mut enc = XdrEncoder::new(&mut self.buffer[..LEN_SIZE]);
        enc.encode_u32(self.offset as u32)
            .map_err(|e| CodecError::Protocol(format!("unable to re-encode frame length: {e}")))?;

        self.length = self.offset;
        self.offset = 0;
        self.buffer.truncate(self.length);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::frame::{HEADER_XDR_LEN, INITIAL_PAYLOAD_CAPACITY, MIN_FRAME_SIZE};

    fn encoded(msg: &mut Message, payload: &[u8]) -> Vec<u8> {
        msg.encode_header().unwrap();
        msg.encode_payload_raw(payload).unwrap();
        msg.buffer().to_vec()
    }

    #[test]
    fn empty_payload_finalises_minimum_frame() {
        let mut msg = Message::new(false);
        let wire = encoded(&mut msg, &[]);

        assert_eq!(wire.len(), MIN_FRAME_SIZE);
        assert_eq!(msg.length(), MIN_FRAME_SIZE);
        assert_eq!(msg.offset(), 0);
        // Length prefix, then an all-zero header.
        assert_eq!(wire[..LEN_SIZE], (MIN_FRAME_SIZE as u32).to_be_bytes());
        assert!(wire[LEN_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn raw_payload_lands_after_header() {
        let mut msg = Message::new(false);
        let wire = encoded(&mut msg, b"stream-chunk");

        assert_eq!(wire.len(), MIN_FRAME_SIZE + 12);
        assert_eq!(&wire[MIN_FRAME_SIZE..], b"stream-chunk");
        assert_eq!(
            wire[..LEN_SIZE],
            ((MIN_FRAME_SIZE + 12) as u32).to_be_bytes()
        );
    }

    #[test]
    fn raw_payload_at_capacity_limit() {
        let data = vec![0xABu8; PAYLOAD_MAX - HEADER_XDR_LEN];
        let mut msg = Message::new(false);
        msg.encode_header().unwrap();
        msg.encode_payload_raw(&data).unwrap();

        assert_eq!(msg.length(), PAYLOAD_MAX + LEN_SIZE);
        assert_eq!(
            msg.buffer()[..LEN_SIZE],
            ((PAYLOAD_MAX + LEN_SIZE) as u32).to_be_bytes()
        );
        assert_eq!(msg.buffer()[MIN_FRAME_SIZE], 0xAB);
        assert_eq!(msg.buffer()[msg.length() - 1], 0xAB);
    }

    #[test]
    fn raw_payload_over_capacity_fails() {
        let data = vec![0xABu8; PAYLOAD_MAX - HEADER_XDR_LEN + 1];
        let mut msg = Message::new(false);
        msg.encode_header().unwrap();

        let err = msg.encode_payload_raw(&data).unwrap_err();
        assert!(matches!(err, CodecError::PayloadTooLarge { .. }), "got {err:?}");
        // No growth happened past the limit.
        assert_eq!(msg.length(), INITIAL_PAYLOAD_CAPACITY + LEN_SIZE);
    }

    #[test]
    fn typed_payload_grows_until_it_fits() {
        // Three doublings needed: 64 KiB -> 512 KiB payload capacity.
        let big = vec![0x5Au8; 300 * 1024];
        let mut msg = Message::new(false);
        msg.encode_header().unwrap();
        msg.encode_payload(|enc, data: &Vec<u8>| enc.encode_opaque(data), &big)
            .unwrap();

        let expect = MIN_FRAME_SIZE + 4 + big.len();
        assert_eq!(msg.length(), expect);
        assert_eq!(msg.buffer()[..LEN_SIZE], (expect as u32).to_be_bytes());

        let mut inc = Message::new(false);
        inc.begin_length_read();
        inc.pending_mut().copy_from_slice(&msg.buffer()[..LEN_SIZE]);
        inc.advance(LEN_SIZE);
        inc.decode_length().unwrap();
        inc.pending_mut().copy_from_slice(&msg.buffer()[LEN_SIZE..]);
        inc.decode_header().unwrap();
        let body = inc
            .decode_payload(|dec| dec.decode_opaque().map(<[u8]>::to_vec))
            .unwrap();
        assert_eq!(body, big);
    }

    #[test]
    fn typed_payload_failure_exhausts_growth() {
        // A filter that never succeeds is indistinguishable from one that
        // always needs more space; the encoder gives up only at the cap.
        let mut msg = Message::new(false);
        msg.encode_header().unwrap();

        let err = msg
            .encode_payload(
                |_, _: &()| Err(XdrError::InvalidValue("always fails")),
                &(),
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::PayloadTooLarge { .. }));
    }

    #[test]
    fn decode_payload_rejects_malformed_input() {
        let mut msg = Message::new(false);
        msg.encode_header().unwrap();
        msg.encode_payload_raw(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();

        msg.offset = MIN_FRAME_SIZE;
        let err = msg
            .decode_payload(|dec| dec.decode_bool())
            .unwrap_err();
        assert!(matches!(err, CodecError::Protocol(_)));
    }

    #[test]
    fn decode_payload_advances_cursor_by_consumed_bytes() {
        let mut msg = Message::new(false);
        msg.encode_header().unwrap();
        msg.encode_payload(|enc, v: &u32| enc.encode_u32(*v), &77)
            .unwrap();

        msg.offset = MIN_FRAME_SIZE;
        let v = msg.decode_payload(|dec| dec.decode_u32()).unwrap();
        assert_eq!(v, 77);
        assert_eq!(msg.offset(), MIN_FRAME_SIZE + 4);
        assert_eq!(msg.pending().len(), 0);
    }

    proptest! {
        #[test]
        fn raw_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let mut out = Message::new(false);
            out.header.serial = 5;
            out.encode_header().unwrap();
            out.encode_payload_raw(&data).unwrap();

            // Length prefix always equals the finalised frame size.
            let wire = out.buffer().to_vec();
            prop_assert_eq!(wire.len(), out.length());
            prop_assert_eq!(
                u32::from_be_bytes(wire[..LEN_SIZE].try_into().unwrap()) as usize,
                out.length()
            );

            let mut inc = Message::new(false);
            inc.begin_length_read();
            inc.pending_mut().copy_from_slice(&wire[..LEN_SIZE]);
            inc.advance(LEN_SIZE);
            inc.decode_length().unwrap();
            inc.pending_mut().copy_from_slice(&wire[LEN_SIZE..]);
            inc.decode_header().unwrap();
            prop_assert_eq!(inc.header, out.header);
            prop_assert_eq!(inc.pending(), data.as_slice());
        }

        #[test]
        fn typed_roundtrip_across_growth_sizes(
            data in proptest::collection::vec(any::<u8>(), 0..200_000),
        ) {
            let mut out = Message::new(false);
            out.header.serial = 1;
            out.encode_header().unwrap();
            out.encode_payload(|enc, d: &Vec<u8>| enc.encode_opaque(d), &data)
                .unwrap();

            // Finalised cursors: offset rewound, length is the frame size,
            // padded opaque body accounted for.
            let pad = (4 - data.len() % 4) % 4;
            prop_assert_eq!(out.offset(), 0);
            prop_assert_eq!(out.length(), MIN_FRAME_SIZE + 4 + data.len() + pad);
            prop_assert_eq!(
                u32::from_be_bytes(out.buffer()[..LEN_SIZE].try_into().unwrap()) as usize,
                out.length()
            );

            let mut inc = Message::new(false);
            inc.begin_length_read();
            inc.pending_mut().copy_from_slice(&out.buffer()[..LEN_SIZE]);
            inc.advance(LEN_SIZE);
            inc.decode_length().unwrap();
            inc.pending_mut().copy_from_slice(&out.buffer()[LEN_SIZE..]);
            inc.decode_header().unwrap();
            let body = inc
                .decode_payload(|dec| dec.decode_opaque().map(<[u8]>::to_vec))
                .unwrap();
            prop_assert_eq!(body, data);
            prop_assert!(inc.offset() <= inc.length());
        }
    }
}
