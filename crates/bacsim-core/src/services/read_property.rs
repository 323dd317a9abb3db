use alloc::vec::Vec;

use crate::apdu::{ComplexAckHeader, ConfirmedRequestHeader};
use crate::encoding::{
    primitives::{
        decode_ctx_object_id, decode_ctx_unsigned, decode_optional_ctx_unsigned,
        encode_ctx_object_id, encode_ctx_unsigned, expect_opening,
    },
    reader::Reader,
    writer::Writer,
};
use crate::services::value_codec::{decode_value_list, encode_value_list};
use crate::types::{DataValue, ObjectId, PropertyId};
use crate::{DecodeError, EncodeError};

pub const SERVICE_READ_PROPERTY: u8 = 0x0C;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub invoke_id: u8,
}

impl ReadPropertyRequest {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        ConfirmedRequestHeader::unsegmented(self.invoke_id, SERVICE_READ_PROPERTY).encode(w)?;

        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(idx) = self.array_index {
            encode_ctx_unsigned(w, 2, idx)?;
        }
        Ok(())
    }

    pub fn decode_after_header(r: &mut Reader<'_>, invoke_id: u8) -> Result<Self, DecodeError> {
        let object_id = decode_ctx_object_id(r, 0)?;
        let property_id = PropertyId::from_u32(decode_ctx_unsigned(r, 1)?);
        let array_index = decode_optional_ctx_unsigned(r, 2)?;
        Ok(Self {
            object_id,
            property_id,
            array_index,
            invoke_id,
        })
    }
}

/// ReadProperty-ACK. A scalar property carries one value; arrays and lists
/// carry every element in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyAck<'a> {
    pub invoke_id: u8,
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub values: Vec<DataValue<'a>>,
}

impl<'a> ReadPropertyAck<'a> {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        ComplexAckHeader::unsegmented(self.invoke_id, SERVICE_READ_PROPERTY).encode(w)?;

        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(idx) = self.array_index {
            encode_ctx_unsigned(w, 2, idx)?;
        }
        encode_value_list(w, 3, &self.values)
    }

    pub fn decode_after_header(r: &mut Reader<'a>, invoke_id: u8) -> Result<Self, DecodeError> {
        let object_id = decode_ctx_object_id(r, 0)?;
        let property_id = PropertyId::from_u32(decode_ctx_unsigned(r, 1)?);
        let array_index = decode_optional_ctx_unsigned(r, 2)?;
        expect_opening(r, 3)?;
        let values = decode_value_list(r, 3)?;

        Ok(Self {
            invoke_id,
            object_id,
            property_id,
            array_index,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ReadPropertyAck, ReadPropertyRequest};
    use crate::apdu::{ComplexAckHeader, ConfirmedRequestHeader};
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{DataValue, ObjectId, ObjectType, PropertyId};
    use alloc::vec;

    #[test]
    fn request_encodes_array_index_as_context_two() {
        let req = ReadPropertyRequest {
            object_id: ObjectId::device(1234),
            property_id: PropertyId::ObjectList,
            array_index: Some(0),
            invoke_id: 3,
        };
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();
        assert_eq!(
            w.as_written(),
            &[0x00, 0x05, 0x03, 0x0C, 0x0C, 0x02, 0x00, 0x04, 0xD2, 0x19, 0x4C, 0x29, 0x00]
        );

        let mut r = Reader::new(w.as_written());
        let hdr = ConfirmedRequestHeader::decode(&mut r).unwrap();
        assert_eq!(
            ReadPropertyRequest::decode_after_header(&mut r, hdr.invoke_id).unwrap(),
            req
        );
    }

    #[test]
    fn ack_carries_every_list_element() {
        let ack = ReadPropertyAck {
            invoke_id: 9,
            object_id: ObjectId::device(7),
            property_id: PropertyId::ObjectList,
            array_index: None,
            values: vec![
                DataValue::ObjectId(ObjectId::device(7)),
                DataValue::ObjectId(ObjectId::new(ObjectType::AnalogInput, 0)),
            ],
        };
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        ack.encode(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        let hdr = ComplexAckHeader::decode(&mut r).unwrap();
        let got = ReadPropertyAck::decode_after_header(&mut r, hdr.invoke_id).unwrap();
        assert_eq!(got, ack);
        assert!(r.is_empty());
    }
}
