use alloc::vec::Vec;
use core::fmt;

use crate::apdu::{
    AbortPdu, ApduType, BacnetError, ComplexAckHeader, ConfirmedRequestHeader, RejectPdu,
    SimpleAck, UnconfirmedRequestHeader,
};
use crate::encoding::{reader::Reader, writer::Writer};
use crate::services::{
    IAmRequest, ReadPropertyAck, ReadPropertyRequest, WhoIsRequest, WritePropertyRequest,
    SERVICE_I_AM, SERVICE_READ_PROPERTY, SERVICE_WHO_IS, SERVICE_WRITE_PROPERTY,
};
use crate::{DecodeError, DecodeErrorKind, EncodeError};

/// Largest APDU carried in a single BACnet/IP datagram.
pub const MAX_APDU_LEN: usize = 1476;

/// A fully decoded APDU.
#[derive(Debug, Clone, PartialEq)]
pub enum Apdu<'a> {
    WhoIs(WhoIsRequest),
    IAm(IAmRequest),
    ReadProperty(ReadPropertyRequest),
    ReadPropertyAck(ReadPropertyAck<'a>),
    WriteProperty(WritePropertyRequest<'a>),
    SimpleAck(SimpleAck),
    Error(BacnetError),
    Reject(RejectPdu),
    Abort(AbortPdu),
}

impl Apdu<'_> {
    pub fn apdu_type(&self) -> ApduType {
        match self {
            Self::WhoIs(_) | Self::IAm(_) => ApduType::UnconfirmedRequest,
            Self::ReadProperty(_) | Self::WriteProperty(_) => ApduType::ConfirmedRequest,
            Self::ReadPropertyAck(_) => ApduType::ComplexAck,
            Self::SimpleAck(_) => ApduType::SimpleAck,
            Self::Error(_) => ApduType::Error,
            Self::Reject(_) => ApduType::Reject,
            Self::Abort(_) => ApduType::Abort,
        }
    }

    /// Invoke-id of confirmed requests and their responses.
    pub fn invoke_id(&self) -> Option<u8> {
        match self {
            Self::WhoIs(_) | Self::IAm(_) => None,
            Self::ReadProperty(r) => Some(r.invoke_id),
            Self::WriteProperty(r) => Some(r.invoke_id),
            Self::ReadPropertyAck(a) => Some(a.invoke_id),
            Self::SimpleAck(a) => Some(a.invoke_id),
            Self::Error(e) => Some(e.invoke_id),
            Self::Reject(r) => Some(r.invoke_id),
            Self::Abort(a) => Some(a.invoke_id),
        }
    }

    pub fn service_choice(&self) -> Option<u8> {
        match self {
            Self::WhoIs(_) => Some(SERVICE_WHO_IS),
            Self::IAm(_) => Some(SERVICE_I_AM),
            Self::ReadProperty(_) | Self::ReadPropertyAck(_) => Some(SERVICE_READ_PROPERTY),
            Self::WriteProperty(_) => Some(SERVICE_WRITE_PROPERTY),
            Self::SimpleAck(a) => Some(a.service_choice),
            Self::Error(e) => Some(e.service_choice),
            Self::Reject(_) | Self::Abort(_) => None,
        }
    }
}

/// Header fields of a confirmed request whose payload failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedContext {
    pub invoke_id: u8,
    pub service_choice: u8,
    pub segmented: bool,
}

/// Decode failure, with the confirmed-request header when it was readable so
/// that the receiver can still answer the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameError {
    pub error: DecodeError,
    pub request: Option<ConfirmedContext>,
}

impl FrameError {
    pub const fn kind(&self) -> DecodeErrorKind {
        self.error.kind()
    }

    fn bare(error: DecodeError) -> Self {
        Self {
            error,
            request: None,
        }
    }
}

impl From<DecodeError> for FrameError {
    fn from(error: DecodeError) -> Self {
        Self::bare(error)
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.request {
            Some(ctx) => write!(
                f,
                "{} (invoke-id {}, service {})",
                self.error, ctx.invoke_id, ctx.service_choice
            ),
            None => fmt::Display::fmt(&self.error, f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

/// Decodes one complete APDU. Trailing octets are an error.
pub fn decode(bytes: &[u8]) -> Result<Apdu<'_>, FrameError> {
    let mut r = Reader::new(bytes);
    let b0 = r.peek_u8()?;
    let apdu = match ApduType::of_first_octet(b0) {
        Some(ApduType::ConfirmedRequest) => return decode_confirmed(&mut r),
        Some(ApduType::UnconfirmedRequest) => {
            let hdr = UnconfirmedRequestHeader::decode(&mut r)?;
            match hdr.service_choice {
                SERVICE_WHO_IS => Apdu::WhoIs(WhoIsRequest::decode_after_header(&mut r)?),
                SERVICE_I_AM => Apdu::IAm(IAmRequest::decode_after_header(&mut r)?),
                other => return Err(DecodeError::UnsupportedService(other).into()),
            }
        }
        Some(ApduType::SimpleAck) => Apdu::SimpleAck(SimpleAck::decode(&mut r)?),
        Some(ApduType::ComplexAck) => {
            let hdr = ComplexAckHeader::decode(&mut r)?;
            if hdr.segmented {
                return Err(DecodeError::Unsupported.into());
            }
            match hdr.service_choice {
                SERVICE_READ_PROPERTY => Apdu::ReadPropertyAck(
                    ReadPropertyAck::decode_after_header(&mut r, hdr.invoke_id)?,
                ),
                other => return Err(DecodeError::UnsupportedService(other).into()),
            }
        }
        Some(ApduType::Error) => Apdu::Error(BacnetError::decode(&mut r)?),
        Some(ApduType::Reject) => Apdu::Reject(RejectPdu::decode(&mut r)?),
        Some(ApduType::Abort) => Apdu::Abort(AbortPdu::decode(&mut r)?),
        Some(ApduType::SegmentAck) => return Err(DecodeError::Unsupported.into()),
        None => return Err(DecodeError::InvalidValue.into()),
    };
    r.finish()?;
    Ok(apdu)
}

fn decode_confirmed<'a>(r: &mut Reader<'a>) -> Result<Apdu<'a>, FrameError> {
    let hdr = ConfirmedRequestHeader::decode(r)?;
    let ctx = ConfirmedContext {
        invoke_id: hdr.invoke_id,
        service_choice: hdr.service_choice,
        segmented: hdr.segmented,
    };
    let with_ctx = |error: DecodeError| FrameError {
        error,
        request: Some(ctx),
    };
    if hdr.segmented {
        return Err(with_ctx(DecodeError::Unsupported));
    }
    let apdu = match hdr.service_choice {
        SERVICE_READ_PROPERTY => Apdu::ReadProperty(
            ReadPropertyRequest::decode_after_header(r, hdr.invoke_id).map_err(with_ctx)?,
        ),
        SERVICE_WRITE_PROPERTY => Apdu::WriteProperty(
            WritePropertyRequest::decode_after_header(r, hdr.invoke_id).map_err(with_ctx)?,
        ),
        other => return Err(with_ctx(DecodeError::UnsupportedService(other))),
    };
    r.finish().map_err(with_ctx)?;
    Ok(apdu)
}

/// Encodes `apdu` into `w`.
pub fn encode_into(apdu: &Apdu<'_>, w: &mut Writer<'_>) -> Result<(), EncodeError> {
    match apdu {
        Apdu::WhoIs(req) => req.encode(w),
        Apdu::IAm(req) => req.encode(w),
        Apdu::ReadProperty(req) => req.encode(w),
        Apdu::ReadPropertyAck(ack) => ack.encode(w),
        Apdu::WriteProperty(req) => req.encode(w),
        Apdu::SimpleAck(ack) => ack.encode(w),
        Apdu::Error(err) => err.encode(w),
        Apdu::Reject(rej) => rej.encode(w),
        Apdu::Abort(abort) => abort.encode(w),
    }
}

/// Encodes `apdu` into a fresh buffer. Fails with
/// [`EncodeError::BufferTooSmall`] past [`MAX_APDU_LEN`].
pub fn encode(apdu: &Apdu<'_>) -> Result<Vec<u8>, EncodeError> {
    let mut buf = [0u8; MAX_APDU_LEN];
    let mut w = Writer::new(&mut buf);
    encode_into(apdu, &mut w)?;
    Ok(w.as_written().to_vec())
}
