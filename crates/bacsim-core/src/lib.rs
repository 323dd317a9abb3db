//! BACnet application-layer codecs for the bacsim device fleet.
//!
//! `bacsim-core` encodes and decodes the NPDU header and the APDUs a simulated
//! device needs to speak: Who-Is, I-Am, ReadProperty, WriteProperty and their
//! acknowledgements and errors. Decoding is zero-copy and never panics; every
//! byte sequence classifies to either an [`Apdu`](codec::Apdu) or a typed
//! [`FrameError`](codec::FrameError).
//!
//! # Feature flags
//!
//! - **`std`** (default) — enables `std::error::Error` implementations.
//! - **`serde`** — serializes object and property identifiers by name.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// APDU headers for confirmed/unconfirmed requests, acknowledgements and errors.
pub mod apdu;
/// Whole-APDU decode/encode entry points.
pub mod codec;
/// Binary encoding primitives, tag system, and zero-copy reader/writer.
pub mod encoding;
/// Error types for encoding and decoding operations.
pub mod error;
/// NPDU (Network Protocol Data Unit) encoding and decoding.
pub mod npdu;
/// Service payload codecs.
pub mod services;
/// Object identifiers, property identifiers, data values and BACnet enumerations.
pub mod types;

pub use codec::{decode, encode, Apdu, FrameError, MAX_APDU_LEN};
pub use error::{DecodeError, DecodeErrorKind, EncodeError};
