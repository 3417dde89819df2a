use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use parking_lot::Mutex;

/// Fans events out to every current subscriber.
///
/// Events are not buffered for future subscribers: with no subscriber at emit
/// time the event is dropped.
pub struct EventEmitter<E> {
    subscribers: Mutex<Vec<UnboundedSender<E>>>,
}

impl<E: Clone> EventEmitter<E> {
    pub fn new() -> Self {
        EventEmitter {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> UnboundedReceiver<E> {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Returns the number of subscribers that received the event.
    pub fn emit(&self, event: E) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| subscriber.unbounded_send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Subscribers whose receiver has not been dropped.
    pub fn listener_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| !subscriber.is_closed());
        subscribers.len()
    }
}

impl<E: Clone> Default for EventEmitter<E> {
    fn default() -> Self {
        EventEmitter::new()
    }
}
