//! Interledger packet serialization/deserialization.
//!
//! Covers the three ILPv4 packet types (Prepare, Fulfill, Reject), ILP addresses,
//! error codes, and the OER helpers used to encode them.

mod address;
mod error;
mod errors;
#[cfg(test)]
mod fixtures;
pub mod oer;
mod packet;

pub use self::address::{Address, AddressError};
pub use self::error::{ErrorClass, ErrorCode};
pub use self::errors::ParseError;

pub use self::packet::{Fulfill, Packet, PacketType, Prepare, Reject};
pub use self::packet::{FulfillBuilder, PrepareBuilder, RejectBuilder};
