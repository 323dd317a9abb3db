pub mod bit_string;
pub mod data_value;
pub mod object_id;
pub mod object_type;
pub mod property_id;
pub mod spec;

pub use bit_string::BitString;
pub use data_value::DataValue;
pub use object_id::ObjectId;
pub use object_type::ObjectType;
pub use property_id::PropertyId;
pub use spec::{
    AbortReason, BinaryPv, EngineeringUnits, ErrorClass, ErrorCode, MaxApdu, RejectReason,
    Segmentation,
};
