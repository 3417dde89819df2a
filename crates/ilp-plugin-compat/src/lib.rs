//! # ilp-plugin-compat
//!
//! Exposes a legacy ledger plugin (the event-based "v1" interface with transfers,
//! string amounts and ledger prefixes) through the "v2" plugin interface that
//! exchanges binary ILP packets via [`Plugin::send_data`] and [`Plugin::send_money`].
//!
//! Use [`adapt`] (or a [`PluginRegistry`] with a custom [`AdapterConfig`]) to turn a
//! [`PluginHandle`] into an `Arc<dyn Plugin>`. Plugins that already speak v2 are
//! returned unchanged, and adapting the same v1 plugin twice returns the same adapter.
//!
//! Adapters spawn their event loop on the current Tokio runtime, so adaptation must
//! happen from within one.

mod adapter;
mod config;
mod convert;
mod correlation;
mod errors;
mod events;
pub mod ildcp;
mod plugin;
mod registry;
mod rejection;
#[cfg(test)]
mod test_helpers;

pub use adapter::PluginAdapter;
pub use config::AdapterConfig;
pub use convert::{
    base64url, decode_base64, fulfill_to_fulfillment, fulfillment_to_fulfill,
    message_to_response, prepare_to_transfer, resolve_destination, transfer_to_prepare,
};
pub use errors::{BoxError, DecodeError, HandlerKind, LedgerError, PluginError};
pub use events::EventEmitter;
pub use plugin::{
    data_handler_fn, money_handler_fn, DataHandler, DataHandlerFn, LedgerEvent, LedgerInfo,
    LedgerPlugin, Message, MoneyHandler, MoneyHandlerFn, Plugin, PluginEvent, PluginHandle,
    RequestHandler, Transfer,
};
pub use registry::{adapt, PluginRegistry};
pub use rejection::{name_for_code, RejectionReason};

use interledger_packet::{Fulfill, Reject};

/// Version marker reported by every [`Plugin`].
pub const PLUGIN_VERSION: u8 = 2;

/// Outcome of an ILP prepare: the network either fulfilled or rejected it.
pub type IlpResult = Result<Fulfill, Reject>;
