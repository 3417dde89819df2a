use crate::errors::{BoxError, LedgerError, PluginError};
use crate::rejection::RejectionReason;
use crate::PLUGIN_VERSION;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::channel::mpsc::UnboundedReceiver;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Ledger metadata reported by a v1 plugin.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerInfo {
    /// Address prefix shared by every account on the ledger, e.g. `g.usd.`.
    pub prefix: String,
    /// Accounts that forward payments off the ledger, in order of preference.
    #[serde(default)]
    pub connectors: Vec<String>,
    pub currency_scale: u8,
    #[serde(alias = "currency")]
    pub currency_code: String,
}

/// A v1 transfer. The binary fields are base64url encoded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<String>,
    pub amount: String,
    /// The complete ILP prepare packet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ilp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_condition: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
}

/// A v1 request or response message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ilp: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
}

/// Lifecycle events that both plugin versions emit.
#[derive(Clone, Debug, PartialEq)]
pub enum PluginEvent {
    Connect,
    Disconnect,
    Error(String),
    InfoChange(LedgerInfo),
}

/// Events emitted by a v1 plugin.
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerEvent {
    Connect,
    Disconnect,
    Error(String),
    InfoChange(LedgerInfo),
    /// A transfer we sent was fulfilled. `data` is the base64url fulfill data.
    OutgoingFulfill {
        transfer: Transfer,
        fulfillment: String,
        data: Option<String>,
    },
    OutgoingReject {
        transfer: Transfer,
        reason: RejectionReason,
    },
    OutgoingCancel {
        transfer: Transfer,
        reason: RejectionReason,
    },
    /// An optimistic transfer arrived; there is nothing to acknowledge.
    IncomingTransfer { transfer: Transfer },
    /// A conditional transfer arrived and awaits `fulfill_condition` or
    /// `reject_incoming_transfer`.
    IncomingPrepare { transfer: Transfer },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Connect => "connect",
            LedgerEvent::Disconnect => "disconnect",
            LedgerEvent::Error(_) => "error",
            LedgerEvent::InfoChange(_) => "info_change",
            LedgerEvent::OutgoingFulfill { .. } => "outgoing_fulfill",
            LedgerEvent::OutgoingReject { .. } => "outgoing_reject",
            LedgerEvent::OutgoingCancel { .. } => "outgoing_cancel",
            LedgerEvent::IncomingTransfer { .. } => "incoming_transfer",
            LedgerEvent::IncomingPrepare { .. } => "incoming_prepare",
        }
    }

    /// The lifecycle event to re-emit on a v2 plugin, if this is one.
    pub fn passthrough(&self) -> Option<PluginEvent> {
        match self {
            LedgerEvent::Connect => Some(PluginEvent::Connect),
            LedgerEvent::Disconnect => Some(PluginEvent::Disconnect),
            LedgerEvent::Error(message) => Some(PluginEvent::Error(message.clone())),
            LedgerEvent::InfoChange(info) => Some(PluginEvent::InfoChange(info.clone())),
            _ => None,
        }
    }
}

/// Answers v1 messages sent to this account.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle_request(&self, message: Message) -> Result<Message, BoxError>;
}

/// The legacy event-based ledger plugin interface.
#[async_trait]
pub trait LedgerPlugin: Send + Sync {
    async fn connect(&self) -> Result<(), LedgerError>;

    async fn disconnect(&self) -> Result<(), LedgerError>;

    fn is_connected(&self) -> bool;

    fn get_info(&self) -> LedgerInfo;

    fn get_account(&self) -> String;

    /// Resolves once the ledger accepted the transfer, not when it settles.
    async fn send_transfer(&self, transfer: Transfer) -> Result<(), LedgerError>;

    async fn send_request(&self, message: Message) -> Result<Message, LedgerError>;

    fn register_request_handler(&self, handler: Arc<dyn RequestHandler>)
        -> Result<(), LedgerError>;

    fn deregister_request_handler(&self);

    async fn fulfill_condition(
        &self,
        transfer_id: &str,
        fulfillment: &str,
        data: Option<&str>,
    ) -> Result<(), LedgerError>;

    async fn reject_incoming_transfer(
        &self,
        transfer_id: &str,
        reason: RejectionReason,
    ) -> Result<(), LedgerError>;

    /// Every subsequent event is delivered to the returned receiver.
    fn subscribe(&self) -> UnboundedReceiver<LedgerEvent>;
}

/// Handles ILP packets sent to this plugin. Gets a prepare and returns a fulfill
/// or reject packet.
#[async_trait]
pub trait DataHandler: Send + Sync {
    async fn handle_data(&self, data: BytesMut) -> Result<BytesMut, BoxError>;
}

/// Handles unconditional payments sent to this plugin.
#[async_trait]
pub trait MoneyHandler: Send + Sync {
    async fn handle_money(&self, amount: String) -> Result<(), BoxError>;
}

/// The data/money plugin interface.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn version(&self) -> u8 {
        PLUGIN_VERSION
    }

    async fn connect(&self) -> Result<(), PluginError>;

    async fn disconnect(&self) -> Result<(), PluginError>;

    fn is_connected(&self) -> bool;

    /// Sends a serialized ILP packet and resolves with the serialized response.
    ///
    /// A reject packet is a successful response.
    async fn send_data(&self, data: BytesMut) -> Result<BytesMut, PluginError>;

    async fn send_money(&self, amount: &str) -> Result<(), PluginError>;

    fn register_data_handler(&self, handler: Arc<dyn DataHandler>) -> Result<(), PluginError>;

    fn deregister_data_handler(&self);

    fn register_money_handler(&self, handler: Arc<dyn MoneyHandler>) -> Result<(), PluginError>;

    fn deregister_money_handler(&self);

    fn subscribe(&self) -> UnboundedReceiver<PluginEvent>;
}

/// A plugin of either interface version, as handed to [`adapt`](crate::adapt).
#[derive(Clone)]
pub enum PluginHandle {
    V1(Arc<dyn LedgerPlugin>),
    V2(Arc<dyn Plugin>),
}

impl From<Arc<dyn LedgerPlugin>> for PluginHandle {
    fn from(plugin: Arc<dyn LedgerPlugin>) -> Self {
        PluginHandle::V1(plugin)
    }
}

impl From<Arc<dyn Plugin>> for PluginHandle {
    fn from(plugin: Arc<dyn Plugin>) -> Self {
        PluginHandle::V2(plugin)
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PluginHandle::V1(_) => f.write_str("PluginHandle::V1"),
            PluginHandle::V2(plugin) => write!(f, "PluginHandle::V2(version {})", plugin.version()),
        }
    }
}

/// A [`DataHandler`] created from a closure with [`data_handler_fn`].
pub struct DataHandlerFn<F, Fut> {
    handler: F,
    _future: PhantomData<fn() -> Fut>,
}

/// Create a [`DataHandler`] from a function that returns a future.
pub fn data_handler_fn<F, Fut>(handler: F) -> DataHandlerFn<F, Fut>
where
    F: Fn(BytesMut) -> Fut + Send + Sync,
    Fut: Future<Output = Result<BytesMut, BoxError>> + Send,
{
    DataHandlerFn {
        handler,
        _future: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> DataHandler for DataHandlerFn<F, Fut>
where
    F: Fn(BytesMut) -> Fut + Send + Sync,
    Fut: Future<Output = Result<BytesMut, BoxError>> + Send,
{
    async fn handle_data(&self, data: BytesMut) -> Result<BytesMut, BoxError> {
        (self.handler)(data).await
    }
}

/// A [`MoneyHandler`] created from a closure with [`money_handler_fn`].
pub struct MoneyHandlerFn<F, Fut> {
    handler: F,
    _future: PhantomData<fn() -> Fut>,
}

/// Create a [`MoneyHandler`] from a function that returns a future.
pub fn money_handler_fn<F, Fut>(handler: F) -> MoneyHandlerFn<F, Fut>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    MoneyHandlerFn {
        handler,
        _future: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> MoneyHandler for MoneyHandlerFn<F, Fut>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    async fn handle_money(&self, amount: String) -> Result<(), BoxError> {
        (self.handler)(amount).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transfer_uses_v1_field_names() {
        let transfer = Transfer {
            id: "abc".to_string(),
            to: Some("g.usd.bob".to_string()),
            amount: "10".to_string(),
            execution_condition: Some("AAAA".to_string()),
            expires_at: Some("2017-12-23T01:21:40.549Z".to_string()),
            ..Transfer::default()
        };
        assert_eq!(
            serde_json::to_value(&transfer).unwrap(),
            json!({
                "id": "abc",
                "to": "g.usd.bob",
                "amount": "10",
                "executionCondition": "AAAA",
                "expiresAt": "2017-12-23T01:21:40.549Z",
            })
        );
    }

    #[test]
    fn ledger_info_accepts_currency_alias() {
        let info: LedgerInfo = serde_json::from_value(json!({
            "prefix": "g.usd.",
            "connectors": ["g.usd.connie"],
            "currencyScale": 2,
            "currency": "USD",
        }))
        .unwrap();
        assert_eq!(info.currency_code, "USD");
        assert_eq!(info.connectors, vec!["g.usd.connie".to_string()]);
    }

    #[test]
    fn only_lifecycle_events_pass_through() {
        assert_eq!(LedgerEvent::Connect.passthrough(), Some(PluginEvent::Connect));
        assert_eq!(
            LedgerEvent::Error("boom".to_string()).passthrough(),
            Some(PluginEvent::Error("boom".to_string()))
        );
        let incoming = LedgerEvent::IncomingTransfer {
            transfer: Transfer::default(),
        };
        assert_eq!(incoming.name(), "incoming_transfer");
        assert_eq!(incoming.passthrough(), None);
    }

    #[tokio::test]
    async fn handler_fns_call_the_closure() {
        let data = data_handler_fn(|packet: BytesMut| async move { Ok::<_, BoxError>(packet) });
        let echoed = data.handle_data(BytesMut::from(&b"ping"[..])).await.unwrap();
        assert_eq!(&echoed[..], b"ping");

        let money = money_handler_fn(|amount: String| async move {
            if amount == "0" {
                Err::<(), BoxError>("zero".into())
            } else {
                Ok(())
            }
        });
        assert!(money.handle_money("5".to_string()).await.is_ok());
        assert!(money.handle_money("0".to_string()).await.is_err());
    }
}
