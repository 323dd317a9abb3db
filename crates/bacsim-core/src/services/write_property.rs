use alloc::vec::Vec;

use crate::apdu::ConfirmedRequestHeader;
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

pub const SERVICE_WRITE_PROPERTY: u8 = 0x0F;

#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest<'a> {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub values: Vec<DataValue<'a>>,
    pub priority: Option<u8>,
    pub invoke_id: u8,
}

impl<'a> WritePropertyRequest<'a> {
    /// Present-value write of a single value at the given priority.
    pub fn present_value(
        invoke_id: u8,
        object_id: ObjectId,
        value: DataValue<'a>,
        priority: Option<u8>,
    ) -> Self {
        Self {
            object_id,
            property_id: PropertyId::PresentValue,
            array_index: None,
            values: alloc::vec![value],
            priority,
            invoke_id,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        ConfirmedRequestHeader::unsegmented(self.invoke_id, SERVICE_WRITE_PROPERTY).encode(w)?;

        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(idx) = self.array_index {
            encode_ctx_unsigned(w, 2, idx)?;
        }

        encode_value_list(w, 3, &self.values)?;

        if let Some(priority) = self.priority {
            encode_ctx_unsigned(w, 4, priority as u32)?;
        }
        Ok(())
    }

    pub fn decode_after_header(r: &mut Reader<'a>, invoke_id: u8) -> Result<Self, DecodeError> {
        let object_id = decode_ctx_object_id(r, 0)?;
        let property_id = PropertyId::from_u32(decode_ctx_unsigned(r, 1)?);
        let array_index = decode_optional_ctx_unsigned(r, 2)?;
        expect_opening(r, 3)?;
        let values = decode_value_list(r, 3)?;
        let priority = match decode_optional_ctx_unsigned(r, 4)? {
            Some(p) => Some(u8::try_from(p).map_err(|_| DecodeError::InvalidValue)?),
            None => None,
        };

        Ok(Self {
            object_id,
            property_id,
            array_index,
            values,
            priority,
            invoke_id,
        })
    }
}
