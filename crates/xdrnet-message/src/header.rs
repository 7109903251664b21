use xdrnet_xdr::{XdrDecoder, XdrEncoder};

/// The fixed-size header carried by every frame.
///
/// `mtype` and `status` hold raw wire discriminants; header decoding does
/// not validate them, so unknown values pass through to the layers that
/// dispatch on them. Use [`MessageType`] and [`MessageStatus`] for checked
/// views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// RPC program identifier.
    pub prog: u32,
    /// RPC program version.
    pub vers: u32,
    /// Procedure number within the program.
    pub procedure: i32,
    /// Raw [`MessageType`] discriminant.
    pub mtype: u32,
    /// Serial number linking calls to replies.
    pub serial: u32,
    /// Raw [`MessageStatus`] discriminant.
    pub status: u32,
}

impl MessageHeader {
    pub fn xdr_encode(&self, enc: &mut XdrEncoder<'_>) -> xdrnet_xdr::Result<()> {
        enc.encode_u32(self.prog)?;
        enc.encode_u32(self.vers)?;
        enc.encode_i32(self.procedure)?;
        enc.encode_u32(self.mtype)?;
        enc.encode_u32(self.serial)?;
        enc.encode_u32(self.status)
    }

    pub fn xdr_decode(dec: &mut XdrDecoder<'_>) -> xdrnet_xdr::Result<Self> {
        Ok(Self {
            prog: dec.decode_u32()?,
            vers: dec.decode_u32()?,
            procedure: dec.decode_i32()?,
            mtype: dec.decode_u32()?,
            serial: dec.decode_u32()?,
            status: dec.decode_u32()?,
        })
    }
}

/// What kind of exchange a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    /// Client request expecting a reply.
    Call = 0,
    /// Server response to a call.
    Reply = 1,
    /// Stream data chunk or completion.
    Stream = 2,
    /// Call carrying ancillary descriptors.
    CallWithFds = 3,
    /// Reply carrying ancillary descriptors.
    ReplyWithFds = 4,
    /// Hole in a sparse stream.
    StreamHole = 5,
}

impl TryFrom<u32> for MessageType {
    type Error = u32;

    fn try_from(v: u32) -> std::result::Result<Self, u32> {
        match v {
            0 => Ok(MessageType::Call),
            1 => Ok(MessageType::Reply),
            2 => Ok(MessageType::Stream),
            3 => Ok(MessageType::CallWithFds),
            4 => Ok(MessageType::ReplyWithFds),
            5 => Ok(MessageType::StreamHole),
            other => Err(other),
        }
    }
}

/// Disposition of a reply or stream frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageStatus {
    /// Successful reply, or stream data following.
    Ok = 0,
    /// The payload is an error record.
    Error = 1,
    /// Stream continuation.
    Continue = 2,
}

impl TryFrom<u32> for MessageStatus {
    type Error = u32;

    fn try_from(v: u32) -> std::result::Result<Self, u32> {
        match v {
            0 => Ok(MessageStatus::Ok),
            1 => Ok(MessageStatus::Error),
            2 => Ok(MessageStatus::Continue),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::HEADER_XDR_LEN;

    #[test]
    fn header_marshals_to_fixed_length() {
        let header = MessageHeader {
            prog: 0x2020_8000,
            vers: 1,
            procedure: 42,
            mtype: MessageType::Call as u32,
            serial: 7,
            status: MessageStatus::Ok as u32,
        };

        let mut buf = [0u8; 64];
        let mut enc = XdrEncoder::new(&mut buf);
        header.xdr_encode(&mut enc).unwrap();
        assert_eq!(enc.pos(), HEADER_XDR_LEN);

        let mut dec = XdrDecoder::new(&buf[..HEADER_XDR_LEN]);
        let decoded = MessageHeader::xdr_decode(&mut dec).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(dec.pos(), HEADER_XDR_LEN);
    }

    #[test]
    fn unknown_discriminants_survive_decoding() {
        let header = MessageHeader {
            mtype: 99,
            status: 17,
            ..MessageHeader::default()
        };

        let mut buf = [0u8; 24];
        let mut enc = XdrEncoder::new(&mut buf);
        header.xdr_encode(&mut enc).unwrap();

        let mut dec = XdrDecoder::new(&buf);
        let decoded = MessageHeader::xdr_decode(&mut dec).unwrap();
        assert_eq!(decoded.mtype, 99);
        assert_eq!(decoded.status, 17);
        assert_eq!(MessageType::try_from(decoded.mtype), Err(99));
        assert_eq!(MessageStatus::try_from(decoded.status), Err(17));
    }

    #[test]
    fn typed_views_roundtrip() {
        assert_eq!(MessageType::try_from(3), Ok(MessageType::CallWithFds));
        assert_eq!(MessageStatus::try_from(2), Ok(MessageStatus::Continue));
        assert_eq!(MessageType::StreamHole as u32, 5);
    }
}
