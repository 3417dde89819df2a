use crate::config::AdapterConfig;
use crate::convert::{
    base64url, decode_base64, fulfill_to_fulfillment, fulfillment_to_fulfill,
    message_to_response, prepare_to_transfer, resolve_destination, transfer_to_prepare,
};
use crate::correlation::PendingTransfers;
use crate::errors::{BoxError, DecodeError, HandlerKind, LedgerError, PluginError};
use crate::events::EventEmitter;
use crate::ildcp::{is_ildcp_request, IldcpResponseBuilder};
use crate::plugin::{
    DataHandler, LedgerEvent, LedgerInfo, LedgerPlugin, Message, MoneyHandler, Plugin,
    PluginEvent, RequestHandler, Transfer,
};
use crate::rejection::RejectionReason;
use crate::IlpResult;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::channel::mpsc::UnboundedReceiver;
use futures::StreamExt;
use interledger_packet::{
    Address, ErrorCode, Fulfill, Packet, PacketType, Prepare, Reject, RejectBuilder,
};
use parking_lot::RwLock;
use serde_json::Map;
use std::convert::TryFrom;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

/// Exposes a [`LedgerPlugin`] as a [`Plugin`].
///
/// Outgoing prepares become conditional v1 transfers; the caller is answered
/// when the ledger reports the transfer fulfilled, rejected or canceled.
/// Incoming conditional transfers are passed to the data handler and
/// acknowledged on the ledger with its answer.
///
/// A ledger has a single request handler. An adapter that cannot install its
/// request forwarder tries again on `connect` and on every ledger event, so it
/// takes over once the previous owner is dropped.
pub struct PluginAdapter {
    this: Weak<PluginAdapter>,
    ledger: Arc<dyn LedgerPlugin>,
    config: AdapterConfig,
    pending: PendingTransfers,
    data_handler: RwLock<Option<Arc<dyn DataHandler>>>,
    money_handler: RwLock<Option<Arc<dyn MoneyHandler>>>,
    events: EventEmitter<PluginEvent>,
    forwarding_requests: AtomicBool,
}

impl PluginAdapter {
    /// Subscribes to the ledger's events and starts processing them on the
    /// current Tokio runtime.
    pub fn new(ledger: Arc<dyn LedgerPlugin>, config: AdapterConfig) -> Arc<Self> {
        let ledger_events = ledger.subscribe();
        let adapter = Arc::new_cyclic(|this| PluginAdapter {
            this: this.clone(),
            ledger,
            config,
            pending: PendingTransfers::new(),
            data_handler: RwLock::new(None),
            money_handler: RwLock::new(None),
            events: EventEmitter::new(),
            forwarding_requests: AtomicBool::new(false),
        });

        if let Err(err) = adapter.forward_requests() {
            warn!(
                "Unable to forward requests from ledger plugin {} yet: {}",
                adapter.ledger.get_account(),
                err
            );
        }

        tokio::spawn(run_event_loop(Arc::downgrade(&adapter), ledger_events));
        adapter
    }

    /// Number of outgoing transfers still waiting for the ledger to settle them.
    pub fn pending_transfers(&self) -> usize {
        self.pending.len()
    }

    fn default_connector(&self, info: &LedgerInfo) -> Option<String> {
        self.config
            .default_connector
            .clone()
            .or_else(|| info.connectors.first().cloned())
    }

    /// Installs the request forwarder unless it is disabled or already installed.
    fn forward_requests(&self) -> Result<(), LedgerError> {
        if !self.config.forward_requests || self.forwarding_requests.load(Ordering::SeqCst) {
            return Ok(());
        }
        let forwarder = Arc::new(RequestForwarder {
            adapter: self.this.clone(),
        });
        self.ledger.register_request_handler(forwarder)?;
        self.forwarding_requests.store(true, Ordering::SeqCst);
        debug!(
            "Forwarding requests from ledger plugin {}",
            self.ledger.get_account()
        );
        Ok(())
    }

    fn retry_forward_requests(&self) {
        if let Err(err) = self.forward_requests() {
            trace!("Request forwarding still unavailable: {}", err);
        }
    }

    fn handle_event(self: &Arc<Self>, event: LedgerEvent) {
        self.retry_forward_requests();
        if let Some(passthrough) = event.passthrough() {
            let listeners = self.events.emit(passthrough);
            trace!("Re-emitted {} event to {} listeners", event.name(), listeners);
            return;
        }

        match event {
            LedgerEvent::OutgoingFulfill {
                transfer,
                fulfillment,
                data,
            } => self.settle(&transfer, "fulfilled", || {
                fulfillment_to_fulfill(&fulfillment, data.as_deref()).map(BytesMut::from)
            }),
            LedgerEvent::OutgoingReject { transfer, reason } => {
                self.settle(&transfer, "rejected", || reason.to_reject().map(BytesMut::from))
            }
            LedgerEvent::OutgoingCancel { transfer, reason } => {
                self.settle(&transfer, "canceled", || reason.to_reject().map(BytesMut::from))
            }
            LedgerEvent::IncomingPrepare { transfer } => {
                let adapter = Arc::clone(self);
                tokio::spawn(async move { adapter.handle_incoming_prepare(transfer).await });
            }
            LedgerEvent::IncomingTransfer { transfer } => {
                let adapter = Arc::clone(self);
                tokio::spawn(async move { adapter.handle_incoming_transfer(transfer).await });
            }
            _ => {}
        }
    }

    /// Answers the `send_data` call waiting on `transfer`, if there is one.
    fn settle<F>(&self, transfer: &Transfer, outcome: &str, response: F)
    where
        F: FnOnce() -> Result<BytesMut, DecodeError>,
    {
        let waiting = match self.pending.take(&transfer.id) {
            Some(waiting) => waiting,
            None => {
                debug!(
                    "Ignoring {} transfer {} that was not sent by this adapter",
                    outcome, transfer.id
                );
                return;
            }
        };

        let response = response().map_err(|err| {
            error!(
                "Unable to convert {} transfer {} to an ILP packet: {}",
                outcome, transfer.id, err
            );
            PluginError::from(err)
        });
        trace!("Outgoing transfer {} was {}", transfer.id, outcome);
        if waiting.send(response).is_err() {
            debug!(
                "Caller stopped waiting for transfer {} before it was {}",
                transfer.id, outcome
            );
        }
    }

    fn ildcp_response(&self) -> BytesMut {
        let info = self.ledger.get_info();
        let account = self.ledger.get_account();
        let response = IldcpResponseBuilder {
            client_address: &account,
            asset_scale: info.currency_scale,
            asset_code: &info.currency_code,
        }
        .build();
        debug!("Answering ILDCP request locally: {:?}", response);
        Fulfill::from(response).into()
    }

    async fn send_prepare(&self, prepare: Prepare) -> Result<BytesMut, PluginError> {
        let info = self.ledger.get_info();
        let to = resolve_destination(
            Some(prepare.destination().as_str()),
            &info.prefix,
            self.default_connector(&info).as_deref(),
        )?;
        let id = Uuid::new_v4().to_string();
        let transfer = Transfer {
            to: Some(to),
            from: Some(self.ledger.get_account()),
            ledger: Some(info.prefix),
            ..prepare_to_transfer(id.clone(), &prepare)
        };

        trace!(
            "Sending transfer {} to {:?} for prepare {:?}",
            id,
            transfer.to,
            prepare
        );
        let settled = self.pending.track(&id);
        if let Err(err) = self.ledger.send_transfer(transfer).await {
            self.pending.forget(&id);
            warn!("Ledger plugin failed to send transfer {}: {}", id, err);
            return Err(err.into());
        }

        match settled.await {
            Ok(response) => response,
            Err(_) => Err(PluginError::Canceled(id)),
        }
    }

    async fn send_message(&self, data: BytesMut) -> Result<BytesMut, PluginError> {
        let info = self.ledger.get_info();
        let to = resolve_destination(None, &info.prefix, self.default_connector(&info).as_deref())?;
        let message = Message {
            id: Uuid::new_v4().to_string(),
            to: Some(to),
            from: Some(self.ledger.get_account()),
            ledger: Some(info.prefix),
            ilp: Some(base64url(&data)),
            custom: Map::new(),
        };
        trace!("Sending request {} to {:?}", message.id, message.to);
        let response = self.ledger.send_request(message).await?;
        Ok(message_to_response(response)?)
    }

    fn reject(&self, code: ErrorCode, message: &str) -> Reject {
        let account = self.ledger.get_account();
        let triggered_by = Address::from_str(account.trim_end_matches('.')).ok();
        RejectBuilder {
            code,
            message: message.as_bytes(),
            triggered_by: triggered_by.as_ref(),
            data: &[],
        }
        .build()
    }

    async fn answer_prepare(&self, transfer: &Transfer) -> IlpResult {
        let prepare = match transfer_to_prepare(transfer) {
            Ok(prepare) => prepare,
            Err(err) => {
                warn!("Unable to decode incoming transfer {}: {}", transfer.id, err);
                return Err(self.reject(ErrorCode::F00_BAD_REQUEST, &err.to_string()));
            }
        };

        let handler = self.data_handler.read().clone();
        let handler = match handler {
            Some(handler) => handler,
            None => {
                debug!(
                    "Rejecting incoming transfer {}: no data handler registered",
                    transfer.id
                );
                return Err(self.reject(
                    ErrorCode::T01_LEDGER_UNREACHABLE,
                    "No data handler registered",
                ));
            }
        };

        let response = match handler.handle_data(prepare.into()).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "Data handler failed on incoming transfer {}: {}",
                    transfer.id, err
                );
                return Err(self.reject(ErrorCode::F00_BAD_REQUEST, &err.to_string()));
            }
        };

        match Packet::try_from(response) {
            Ok(Packet::Fulfill(fulfill)) => Ok(fulfill),
            Ok(Packet::Reject(reject)) => Err(reject),
            Ok(other) => {
                let err = DecodeError::UnexpectedPacket {
                    expected: PacketType::Fulfill,
                    actual: other.packet_type(),
                };
                warn!("Data handler answered transfer {} with {}", transfer.id, err);
                Err(self.reject(ErrorCode::F00_BAD_REQUEST, &err.to_string()))
            }
            Err(err) => {
                warn!(
                    "Data handler answered transfer {} with an invalid packet: {}",
                    transfer.id, err
                );
                Err(self.reject(ErrorCode::F00_BAD_REQUEST, &err.to_string()))
            }
        }
    }

    async fn handle_incoming_prepare(&self, transfer: Transfer) {
        let acknowledged = match self.answer_prepare(&transfer).await {
            Ok(fulfill) => {
                trace!("Fulfilling incoming transfer {}", transfer.id);
                let (fulfillment, data) = fulfill_to_fulfillment(&fulfill);
                self.ledger
                    .fulfill_condition(&transfer.id, &fulfillment, Some(&data))
                    .await
            }
            Err(reject) => {
                let reason = RejectionReason::from_reject(&reject, &self.ledger.get_account());
                trace!(
                    "Rejecting incoming transfer {} with {}",
                    transfer.id,
                    reason.code
                );
                self.ledger
                    .reject_incoming_transfer(&transfer.id, reason)
                    .await
            }
        };

        if let Err(err) = acknowledged {
            error!(
                "Ledger plugin failed to acknowledge incoming transfer {}: {}",
                transfer.id, err
            );
        }
    }

    async fn handle_incoming_transfer(&self, transfer: Transfer) {
        let handler = self.money_handler.read().clone();
        match handler {
            Some(handler) => {
                if let Err(err) = handler.handle_money(transfer.amount).await {
                    warn!(
                        "Money handler failed on incoming transfer {}: {}",
                        transfer.id, err
                    );
                }
            }
            None => warn!(
                "Dropping incoming transfer {} of {}: no money handler registered",
                transfer.id, transfer.amount
            ),
        }
    }

    async fn handle_incoming_request(&self, message: Message) -> Result<Message, BoxError> {
        let ilp = message.ilp.as_deref().ok_or(DecodeError::Missing("ilp"))?;
        let data = BytesMut::from(&decode_base64(ilp)?[..]);
        let handler = self
            .data_handler
            .read()
            .clone()
            .ok_or(LedgerError::NoRequestHandler)?;

        trace!("Passing request {} to the data handler", message.id);
        let response = handler.handle_data(data).await?;
        Ok(Message {
            id: message.id,
            to: message.from,
            from: message.to,
            ledger: message.ledger,
            ilp: Some(base64url(&response)),
            custom: Map::new(),
        })
    }
}

impl Drop for PluginAdapter {
    fn drop(&mut self) {
        if self.forwarding_requests.load(Ordering::SeqCst) {
            self.ledger.deregister_request_handler();
        }
    }
}

async fn run_event_loop(adapter: Weak<PluginAdapter>, mut events: UnboundedReceiver<LedgerEvent>) {
    while let Some(event) = events.next().await {
        match adapter.upgrade() {
            Some(adapter) => adapter.handle_event(event),
            None => break,
        }
    }
    trace!("Stopped listening to ledger plugin events");
}

struct RequestForwarder {
    adapter: Weak<PluginAdapter>,
}

#[async_trait]
impl RequestHandler for RequestForwarder {
    async fn handle_request(&self, message: Message) -> Result<Message, BoxError> {
        match self.adapter.upgrade() {
            Some(adapter) => adapter.handle_incoming_request(message).await,
            None => Err(LedgerError::NoRequestHandler.into()),
        }
    }
}

#[async_trait]
impl Plugin for PluginAdapter {
    async fn connect(&self) -> Result<(), PluginError> {
        self.retry_forward_requests();
        Ok(self.ledger.connect().await?)
    }

    async fn disconnect(&self) -> Result<(), PluginError> {
        Ok(self.ledger.disconnect().await?)
    }

    fn is_connected(&self) -> bool {
        self.ledger.is_connected()
    }

    async fn send_data(&self, data: BytesMut) -> Result<BytesMut, PluginError> {
        if data.is_empty() {
            return Err(PluginError::InvalidArgument(
                "cannot send an empty packet".to_string(),
            ));
        }

        if data[0] != PacketType::Prepare as u8 {
            return self.send_message(data).await;
        }

        let prepare = Prepare::try_from(data).map_err(DecodeError::from)?;
        if self.config.answer_ildcp_locally && is_ildcp_request(&prepare) {
            return Ok(self.ildcp_response());
        }
        self.send_prepare(prepare).await
    }

    async fn send_money(&self, amount: &str) -> Result<(), PluginError> {
        if amount.parse::<u64>().is_err() {
            return Err(PluginError::InvalidArgument(format!(
                "invalid amount: {:?}",
                amount
            )));
        }

        let info = self.ledger.get_info();
        let to = resolve_destination(None, &info.prefix, self.default_connector(&info).as_deref())?;
        let transfer = Transfer {
            id: Uuid::new_v4().to_string(),
            to: Some(to),
            from: Some(self.ledger.get_account()),
            ledger: Some(info.prefix),
            amount: amount.to_string(),
            ..Transfer::default()
        };
        trace!("Sending {} to {:?}", amount, transfer.to);
        Ok(self.ledger.send_transfer(transfer).await?)
    }

    fn register_data_handler(&self, handler: Arc<dyn DataHandler>) -> Result<(), PluginError> {
        let mut slot = self.data_handler.write();
        if slot.is_some() {
            return Err(PluginError::AlreadyRegistered(HandlerKind::Data));
        }
        *slot = Some(handler);
        Ok(())
    }

    fn deregister_data_handler(&self) {
        self.data_handler.write().take();
    }

    fn register_money_handler(&self, handler: Arc<dyn MoneyHandler>) -> Result<(), PluginError> {
        let mut slot = self.money_handler.write();
        if slot.is_some() {
            return Err(PluginError::AlreadyRegistered(HandlerKind::Money));
        }
        *slot = Some(handler);
        Ok(())
    }

    fn deregister_money_handler(&self) {
        self.money_handler.write().take();
    }

    fn subscribe(&self) -> UnboundedReceiver<PluginEvent> {
        self.events.subscribe()
    }
}
