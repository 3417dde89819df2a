use crate::errors::{LedgerError, PluginError};
use crate::events::EventEmitter;
use crate::plugin::*;
use crate::rejection::RejectionReason;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::channel::mpsc::UnboundedReceiver;
use interledger_packet::{Address, PrepareBuilder};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

pub static EXECUTION_CONDITION: [u8; 32] = [
    117, 25, 14, 36, 111, 116, 135, 33, 209, 78, 73, 160, 92, 146, 21, 54, 230, 203, 152, 27, 155,
    117, 181, 233, 240, 230, 5, 128, 86, 240, 139, 34,
];

pub static BOB: Lazy<Address> = Lazy::new(|| Address::from_str("g.usd.bob.invoices.42").unwrap());

pub fn init_logging() {
    let _ = env_logger::try_init();
}

pub fn test_prepare(destination: &Address) -> BytesMut {
    PrepareBuilder {
        amount: 100,
        expires_at: SystemTime::now() + Duration::from_secs(30),
        execution_condition: &EXECUTION_CONDITION,
        destination: destination.clone(),
        data: b"test data",
    }
    .build()
    .into()
}

/// Polls `condition` until it holds, giving spawned tasks a chance to run.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

pub fn default_info() -> LedgerInfo {
    LedgerInfo {
        prefix: "g.usd.".to_string(),
        connectors: vec!["g.usd.connie".to_string()],
        currency_scale: 9,
        currency_code: "USD".to_string(),
    }
}

/// An in-memory v1 ledger plugin. Two mocks joined with [`connect_pair`]
/// behave like two accounts on one ledger.
///
/// [`connect_pair`]: MockLedgerPlugin::connect_pair
pub struct MockLedgerPlugin {
    account: String,
    info: LedgerInfo,
    connected: AtomicBool,
    events: EventEmitter<LedgerEvent>,
    peer: Mutex<Weak<MockLedgerPlugin>>,
    request_handler: Mutex<Option<Arc<dyn RequestHandler>>>,
    request_response: Mutex<Option<Message>>,
    fail_transfers: AtomicBool,
    incoming: Mutex<HashMap<String, Transfer>>,
    pub sent_transfers: Mutex<Vec<Transfer>>,
    pub sent_requests: Mutex<Vec<Message>>,
    pub fulfilled: Mutex<Vec<(String, String, Option<String>)>>,
    pub rejected: Mutex<Vec<(String, RejectionReason)>>,
}

impl MockLedgerPlugin {
    pub fn new(account: &str) -> Arc<Self> {
        MockLedgerPlugin::with_info(account, default_info())
    }

    pub fn with_info(account: &str, info: LedgerInfo) -> Arc<Self> {
        Arc::new(MockLedgerPlugin {
            account: account.to_string(),
            info,
            connected: AtomicBool::new(false),
            events: EventEmitter::new(),
            peer: Mutex::new(Weak::new()),
            request_handler: Mutex::new(None),
            request_response: Mutex::new(None),
            fail_transfers: AtomicBool::new(false),
            incoming: Mutex::new(HashMap::new()),
            sent_transfers: Mutex::new(Vec::new()),
            sent_requests: Mutex::new(Vec::new()),
            fulfilled: Mutex::new(Vec::new()),
            rejected: Mutex::new(Vec::new()),
        })
    }

    pub fn connect_pair(a: &Arc<Self>, b: &Arc<Self>) {
        *a.peer.lock() = Arc::downgrade(b);
        *b.peer.lock() = Arc::downgrade(a);
    }

    pub fn emit(&self, event: LedgerEvent) {
        self.events.emit(event);
    }

    pub fn subscription_count(&self) -> usize {
        self.events.listener_count()
    }

    pub fn fail_transfers(&self) {
        self.fail_transfers.store(true, Ordering::SeqCst);
    }

    pub fn respond_to_requests_with(&self, message: Message) {
        *self.request_response.lock() = Some(message);
    }

    pub fn has_request_handler(&self) -> bool {
        self.request_handler.lock().is_some()
    }

    fn peer(&self) -> Option<Arc<MockLedgerPlugin>> {
        self.peer.lock().upgrade()
    }

    fn deliver(&self, transfer: Transfer) {
        if transfer.execution_condition.is_some() {
            self.incoming
                .lock()
                .insert(transfer.id.clone(), transfer.clone());
            self.events.emit(LedgerEvent::IncomingPrepare { transfer });
        } else {
            self.events.emit(LedgerEvent::IncomingTransfer { transfer });
        }
    }
}

#[async_trait]
impl LedgerPlugin for MockLedgerPlugin {
    async fn connect(&self) -> Result<(), LedgerError> {
        self.connected.store(true, Ordering::SeqCst);
        self.events.emit(LedgerEvent::Connect);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), LedgerError> {
        self.connected.store(false, Ordering::SeqCst);
        self.events.emit(LedgerEvent::Disconnect);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn get_info(&self) -> LedgerInfo {
        self.info.clone()
    }

    fn get_account(&self) -> String {
        self.account.clone()
    }

    async fn send_transfer(&self, transfer: Transfer) -> Result<(), LedgerError> {
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(LedgerError::Other("insufficient balance".to_string()));
        }
        self.sent_transfers.lock().push(transfer.clone());
        if let Some(peer) = self.peer() {
            peer.deliver(transfer);
        }
        Ok(())
    }

    async fn send_request(&self, message: Message) -> Result<Message, LedgerError> {
        self.sent_requests.lock().push(message.clone());
        let handler = match self.peer() {
            Some(peer) => {
                let handler = peer.request_handler.lock().clone();
                handler
            }
            None => None,
        };
        if let Some(handler) = handler {
            return handler
                .handle_request(message)
                .await
                .map_err(|err| LedgerError::Other(err.to_string()));
        }
        self.request_response
            .lock()
            .clone()
            .ok_or(LedgerError::NoRequestHandler)
    }

    fn register_request_handler(
        &self,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), LedgerError> {
        let mut slot = self.request_handler.lock();
        if slot.is_some() {
            return Err(LedgerError::RequestHandlerRegistered);
        }
        *slot = Some(handler);
        Ok(())
    }

    fn deregister_request_handler(&self) {
        self.request_handler.lock().take();
    }

    async fn fulfill_condition(
        &self,
        transfer_id: &str,
        fulfillment: &str,
        data: Option<&str>,
    ) -> Result<(), LedgerError> {
        self.fulfilled.lock().push((
            transfer_id.to_string(),
            fulfillment.to_string(),
            data.map(str::to_string),
        ));
        let transfer = self.incoming.lock().remove(transfer_id);
        if let (Some(transfer), Some(peer)) = (transfer, self.peer()) {
            peer.emit(LedgerEvent::OutgoingFulfill {
                transfer,
                fulfillment: fulfillment.to_string(),
                data: data.map(str::to_string),
            });
        }
        Ok(())
    }

    async fn reject_incoming_transfer(
        &self,
        transfer_id: &str,
        reason: RejectionReason,
    ) -> Result<(), LedgerError> {
        self.rejected
            .lock()
            .push((transfer_id.to_string(), reason.clone()));
        let transfer = self.incoming.lock().remove(transfer_id);
        if let (Some(transfer), Some(peer)) = (transfer, self.peer()) {
            peer.emit(LedgerEvent::OutgoingReject { transfer, reason });
        }
        Ok(())
    }

    fn subscribe(&self) -> UnboundedReceiver<LedgerEvent> {
        self.events.subscribe()
    }
}

/// A plugin that already speaks the data/money interface.
pub struct MockPlugin {
    version: u8,
    pub events: EventEmitter<PluginEvent>,
}

impl MockPlugin {
    pub fn new(version: u8) -> Arc<Self> {
        Arc::new(MockPlugin {
            version,
            events: EventEmitter::new(),
        })
    }
}

#[async_trait]
impl Plugin for MockPlugin {
    fn version(&self) -> u8 {
        self.version
    }

    async fn connect(&self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn send_data(&self, data: BytesMut) -> Result<BytesMut, PluginError> {
        Ok(data)
    }

    async fn send_money(&self, _amount: &str) -> Result<(), PluginError> {
        Ok(())
    }

    fn register_data_handler(&self, _handler: Arc<dyn DataHandler>) -> Result<(), PluginError> {
        Ok(())
    }

    fn deregister_data_handler(&self) {}

    fn register_money_handler(&self, _handler: Arc<dyn MoneyHandler>) -> Result<(), PluginError> {
        Ok(())
    }

    fn deregister_money_handler(&self) {}

    fn subscribe(&self) -> UnboundedReceiver<PluginEvent> {
        self.events.subscribe()
    }
}
