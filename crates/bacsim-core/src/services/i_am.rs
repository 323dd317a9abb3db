use crate::apdu::UnconfirmedRequestHeader;
use crate::encoding::{
    primitives::{
        decode_app_enumerated, decode_app_object_id, decode_app_unsigned, encode_app_enumerated,
        encode_app_object_id, encode_app_unsigned,
    },
    reader::Reader,
    writer::Writer,
};
use crate::types::{ObjectId, ObjectType, Segmentation};
use crate::{DecodeError, EncodeError};

pub const SERVICE_I_AM: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IAmRequest {
    pub device_id: ObjectId,
    pub max_apdu: u32,
    pub segmentation: u32,
    pub vendor_id: u32,
}

impl IAmRequest {
    pub fn segmentation(&self) -> Option<Segmentation> {
        Segmentation::from_u32(self.segmentation)
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.device_id.object_type() != ObjectType::Device {
            return Err(EncodeError::Message("i-am must carry a device identifier"));
        }
        UnconfirmedRequestHeader {
            service_choice: SERVICE_I_AM,
        }
        .encode(w)?;

        encode_app_object_id(w, self.device_id)?;
        encode_app_unsigned(w, self.max_apdu)?;
        encode_app_enumerated(w, self.segmentation)?;
        encode_app_unsigned(w, self.vendor_id)?;
        Ok(())
    }

    pub fn decode_after_header(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let device_id = decode_app_object_id(r)?;
        if device_id.object_type() != ObjectType::Device {
            return Err(DecodeError::InvalidValue);
        }
        let max_apdu = decode_app_unsigned(r)?;
        let segmentation = decode_app_enumerated(r)?;
        let vendor_id = decode_app_unsigned(r)?;

        Ok(Self {
            device_id,
            max_apdu,
            segmentation,
            vendor_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::IAmRequest;
    use crate::apdu::UnconfirmedRequestHeader;
    use crate::encoding::{reader::Reader, tag::AppTag, tag::Tag, writer::Writer};
    use crate::types::{ObjectId, ObjectType, Segmentation};
    use crate::DecodeError;

    #[test]
    fn i_am_segmentation_is_enumerated() {
        let req = IAmRequest {
            device_id: ObjectId::device(1234),
            max_apdu: 1476,
            segmentation: Segmentation::NoSegmentation.to_u32(),
            vendor_id: 15,
        };
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        let _hdr = UnconfirmedRequestHeader::decode(&mut r).unwrap();
        let _obj = Tag::decode(&mut r).unwrap();
        let _obj_data = r.read_exact(4).unwrap();
        let _max = Tag::decode(&mut r).unwrap();
        let _max_data = r.read_exact(2).unwrap();
        let seg_tag = Tag::decode(&mut r).unwrap();
        assert_eq!(
            seg_tag,
            Tag::Application {
                tag: AppTag::Enumerated,
                len: 1
            }
        );
    }

    #[test]
    fn non_device_identifier_is_rejected() {
        let mut r = Reader::new(&[0xC4, 0x00, 0x00, 0x00, 0x01, 0x21, 0x32, 0x91, 0x03, 0x21, 0x0F]);
        assert_eq!(
            IAmRequest::decode_after_header(&mut r).unwrap_err(),
            DecodeError::InvalidValue
        );
        let id = ObjectId::new(ObjectType::AnalogInput, 1);
        assert_ne!(id.object_type(), ObjectType::Device);
    }
}
