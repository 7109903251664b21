use std::cell::RefCell;

use xdrnet_xdr::{XdrDecoder, XdrEncoder};

/// Error codes carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Ok = 0,
    InternalError = 1,
    Rpc = 2,
    System = 3,
    NoSupport = 4,
}

/// Which subsystem raised the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorDomain {
    None = 0,
    Rpc = 1,
    System = 2,
}

/// Severity of the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorLevel {
    None = 0,
    Warning = 1,
    Error = 2,
}

/// The thread-local last-error record set by whichever operation failed
/// most recently on this thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub domain: ErrorDomain,
    pub level: ErrorLevel,
    pub message: Option<String>,
    pub str1: Option<String>,
    pub str2: Option<String>,
    pub int1: i32,
    pub int2: i32,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self {
            code,
            domain,
            level: ErrorLevel::Error,
            message: Some(message.into()),
            str1: None,
            str2: None,
            int1: 0,
            int2: 0,
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<ErrorInfo>> = const { RefCell::new(None) };
}

/// Record `err` as this thread's last error, replacing any previous one.
pub fn set_last_error(err: ErrorInfo) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = Some(err));
}

/// A copy of this thread's last error, if any.
pub fn last_error() -> Option<ErrorInfo> {
    LAST_ERROR.with(|cell| cell.borrow().clone())
}

pub fn clear_last_error() {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = None);
}

/// The wire-representable error body sent to peers when a call fails.
///
/// `code`, `domain`, and `level` are raw discriminants of the enums above
/// so unknown peer values survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireError {
    pub code: u32,
    pub domain: u32,
    pub level: u32,
    pub message: Option<String>,
    pub str1: Option<String>,
    pub str2: Option<String>,
    pub int1: i32,
    pub int2: i32,
}

impl WireError {
    /// Snapshot the thread-local last error into this record.
    ///
    /// Cleanup paths call this from several points and routinely overwrite
    /// the thread-local error along the way, so only the first capture into
    /// a record sticks; once `code` is non-OK the call is a no-op. When no
    /// thread-local error is set a synthetic internal error is recorded so
    /// the peer always sees some explanation.
    pub fn capture(&mut self) {
        if self.code != ErrorCode::Ok as u32 {
            return;
        }

        *self = WireError::default();
        match last_error() {
            Some(err) => {
                self.code = err.code as u32;
                self.domain = err.domain as u32;
                self.level = err.level as u32;
                self.message = err.message;
                self.str1 = err.str1;
                self.str2 = err.str2;
                self.int1 = err.int1;
                self.int2 = err.int2;
            }
            None => {
                self.code = ErrorCode::InternalError as u32;
                self.domain = ErrorDomain::Rpc as u32;
                self.level = ErrorLevel::Error as u32;
                self.message =
                    Some("operation failed but recorded no cause".to_owned());
            }
        }
    }

    pub fn xdr_encode(&self, enc: &mut XdrEncoder<'_>) -> xdrnet_xdr::Result<()> {
        enc.encode_u32(self.code)?;
        enc.encode_u32(self.domain)?;
        enc.encode_u32(self.level)?;
        encode_opt_string(enc, self.message.as_deref())?;
        encode_opt_string(enc, self.str1.as_deref())?;
        encode_opt_string(enc, self.str2.as_deref())?;
        enc.encode_i32(self.int1)?;
        enc.encode_i32(self.int2)
    }

    pub fn xdr_decode(dec: &mut XdrDecoder<'_>) -> xdrnet_xdr::Result<Self> {
        Ok(Self {
            code: dec.decode_u32()?,
            domain: dec.decode_u32()?,
            level: dec.decode_u32()?,
            message: decode_opt_string(dec)?,
            str1: decode_opt_string(dec)?,
            str2: decode_opt_string(dec)?,
            int1: dec.decode_i32()?,
            int2: dec.decode_i32()?,
        })
    }
}

/// XDR optional: a presence word, then the string when present.
fn encode_opt_string(enc: &mut XdrEncoder<'_>, s: Option<&str>) -> xdrnet_xdr::Result<()> {
    match s {
        Some(s) => {
            enc.encode_bool(true)?;
            enc.encode_string(s)
        }
        None => enc.encode_bool(false),
    }
}

fn decode_opt_string(dec: &mut XdrDecoder<'_>) -> xdrnet_xdr::Result<Option<String>> {
    if dec.decode_bool()? {
        Ok(Some(dec.decode_string()?))
    } else {
        Ok(None)
    }
}
