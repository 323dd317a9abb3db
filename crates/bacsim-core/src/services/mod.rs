/// I-Am announcement (unconfirmed service 0).
pub mod i_am;
/// ReadProperty request and acknowledgement (confirmed service 12).
pub mod read_property;
/// Application-tagged value encoding shared by the property services.
pub mod value_codec;
/// Who-Is discovery request (unconfirmed service 8).
pub mod who_is;
/// WriteProperty request (confirmed service 15).
pub mod write_property;

pub use i_am::{IAmRequest, SERVICE_I_AM};
pub use read_property::{ReadPropertyAck, ReadPropertyRequest, SERVICE_READ_PROPERTY};
pub use who_is::{WhoIsRequest, SERVICE_WHO_IS};
pub use write_property::{WritePropertyRequest, SERVICE_WRITE_PROPERTY};
