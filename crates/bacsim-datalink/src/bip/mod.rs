/// BACnet Virtual Link Control framing.
pub mod bvlc;
/// UDP transport speaking BVLC.
pub mod transport;
