use interledger_packet::{AddressError, PacketType, ParseError};
use std::fmt;

/// Error type returned by data and money handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandlerKind {
    Data,
    Money,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HandlerKind::Data => f.write_str("data"),
            HandlerKind::Money => f.write_str("money"),
        }
    }
}

/// Errors surfaced by the v2 plugin interface.
///
/// A reject packet from the network is not an error: `send_data` resolves with it.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("A {0} handler is already registered")]
    AlreadyRegistered(HandlerKind),
    #[error("Unable to route: {0}")]
    Routing(String),
    #[error("Unable to decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("Ledger plugin error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Transfer {0} was dropped before it settled")]
    Canceled(String),
}

/// Failures converting between v1 records and ILP packets.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid ILP packet: {0}")]
    Packet(#[from] ParseError),
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Invalid amount: {0:?}")]
    Amount(String),
    #[error("Invalid timestamp {0:?}: {1}")]
    Timestamp(String, chrono::ParseError),
    #[error("Expected {expected} bytes for the {field}, got {actual}")]
    Length {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{0}")]
    Address(#[from] AddressError),
    #[error("Invalid rejection code: {0:?}")]
    Code(String),
    #[error("Missing {0}")]
    Missing(&'static str),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a {expected:?} packet, got {actual:?}")]
    UnexpectedPacket {
        expected: PacketType,
        actual: PacketType,
    },
}

/// Failures reported by a v1 ledger plugin.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Not connected")]
    NotConnected,
    #[error("A request handler is already registered")]
    RequestHandlerRegistered,
    #[error("No request handler is registered")]
    NoRequestHandler,
    #[error("Transfer {0} not found")]
    TransferNotFound(String),
    #[error("{0}")]
    Other(String),
}
