use crate::errors::PluginError;
use bytes::BytesMut;
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::collections::HashMap;

pub(crate) type Settlement = Result<BytesMut, PluginError>;

/// Outgoing transfers awaiting their terminal ledger event, by transfer id.
///
/// Each entry is taken at most once, so a transfer settles at most once.
#[derive(Default)]
pub(crate) struct PendingTransfers {
    pending: Mutex<HashMap<String, oneshot::Sender<Settlement>>>,
}

impl PendingTransfers {
    pub fn new() -> Self {
        PendingTransfers::default()
    }

    /// Starts tracking `id`. The receiver completes when the entry is settled
    /// and is canceled if the entry is forgotten or the table dropped.
    pub fn track(&self, id: &str) -> oneshot::Receiver<Settlement> {
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().insert(id.to_string(), sender);
        receiver
    }

    pub fn take(&self, id: &str) -> Option<oneshot::Sender<Settlement>> {
        self.pending.lock().remove(id)
    }

    pub fn forget(&self, id: &str) {
        self.pending.lock().remove(id);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }
}
