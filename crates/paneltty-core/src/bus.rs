//! Socket instance event bus and scoped subscriptions.
//!
//! A [`SocketInstance`] is the client-side face of one live connection:
//! handlers register on named channels, inbound events are dispatched to
//! the `"event"` channel, and `emit` queues outbound frames for the writer
//! task. A [`Subscription`] pairs a registration with its removal: it
//! unregisters on [`Subscription::release`] or on drop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::events::{OutboundFrame, ServerEvent};

/// Channel on which inbound server events are dispatched.
pub const EVENT_CHANNEL: &str = "event";

/// Callback invoked for each dispatched event.
pub type EventHandler = Box<dyn FnMut(&ServerEvent) + Send>;

/// Identity of a connection instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

/// Identity of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

struct Listener {
    channel: String,
    id: ListenerId,
    handler: EventHandler,
}

#[derive(Default)]
struct EventBus {
    next_listener: u64,
    listeners: Vec<Listener>,
}

/// Handle to one live socket connection. Clones share the same bus.
#[derive(Clone)]
pub struct SocketInstance {
    id: InstanceId,
    bus: Arc<Mutex<EventBus>>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl std::fmt::Debug for SocketInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketInstance")
            .field("id", &self.id)
            .field("listeners", &self.lock().listeners.len())
            .finish_non_exhaustive()
    }
}

impl PartialEq for SocketInstance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SocketInstance {}

impl SocketInstance {
    /// Create an instance and the receiving end of its outbound queue.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let instance = Self {
            id: InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)),
            bus: Arc::new(Mutex::new(EventBus::default())),
            outbound,
        };
        (instance, rx)
    }

    pub const fn id(&self) -> InstanceId {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, EventBus> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `handler` on `channel`.
    pub fn on(&self, channel: &str, handler: EventHandler) -> ListenerId {
        let mut bus = self.lock();
        bus.next_listener += 1;
        let id = ListenerId(bus.next_listener);
        bus.listeners.push(Listener {
            channel: channel.to_string(),
            id,
            handler,
        });
        tracing::trace!(instance = self.id.0, channel, listener = id.0, "Handler registered");
        id
    }

    /// Unregister a handler. Returns `false` if it was not registered.
    pub fn off(&self, channel: &str, id: ListenerId) -> bool {
        let mut bus = self.lock();
        let before = bus.listeners.len();
        bus.listeners.retain(|l| !(l.id == id && l.channel == channel));
        let removed = bus.listeners.len() != before;
        if removed {
            tracing::trace!(instance = self.id.0, channel, listener = id.0, "Handler removed");
        }
        removed
    }

    /// Number of handlers currently registered on `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.lock()
            .listeners
            .iter()
            .filter(|l| l.channel == channel)
            .count()
    }

    /// Deliver an inbound event to every handler on the event channel, in
    /// registration order.
    ///
    /// Handlers run with the bus locked and must not call back into this
    /// instance.
    pub fn dispatch(&self, event: &ServerEvent) {
        let mut bus = self.lock();
        for listener in bus
            .listeners
            .iter_mut()
            .filter(|l| l.channel == EVENT_CHANNEL)
        {
            (listener.handler)(event);
        }
    }

    /// Queue an outbound message. Returns `false` once the writer side is gone.
    pub fn emit(&self, channel: &str, payload: &str) -> bool {
        let sent = self
            .outbound
            .send(OutboundFrame::new(channel, payload))
            .is_ok();
        if !sent {
            tracing::debug!(instance = self.id.0, channel, "Emit on closed instance dropped");
        }
        sent
    }
}

/// A handler registration that is removed when released or dropped.
#[derive(Debug)]
pub struct Subscription {
    instance: SocketInstance,
    channel: &'static str,
    listener: Option<ListenerId>,
}

impl Subscription {
    /// Register `handler` on `channel` of `instance`.
    pub fn acquire(instance: &SocketInstance, channel: &'static str, handler: EventHandler) -> Self {
        let listener = instance.on(channel, handler);
        Self {
            instance: instance.clone(),
            channel,
            listener: Some(listener),
        }
    }

    /// The instance this subscription is attached to.
    pub const fn instance(&self) -> &SocketInstance {
        &self.instance
    }

    /// Unregister now.
    pub fn release(mut self) {
        self.unregister();
    }

    fn unregister(&mut self) {
        if let Some(id) = self.listener.take() {
            self.instance.off(self.channel, id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> EventHandler {
        let counter = Arc::clone(counter);
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dispatch_reaches_event_listeners_only() {
        let (instance, _rx) = SocketInstance::new();
        let events = Arc::new(AtomicUsize::new(0));
        let other = Arc::new(AtomicUsize::new(0));
        instance.on(EVENT_CHANNEL, counting_handler(&events));
        instance.on("stats", counting_handler(&other));

        instance.dispatch(&ServerEvent::StatusUpdate("x".into()));
        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert_eq!(other.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn off_removes_only_the_given_listener() {
        let (instance, _rx) = SocketInstance::new();
        let a = instance.on(EVENT_CHANNEL, Box::new(|_| {}));
        let _b = instance.on(EVENT_CHANNEL, Box::new(|_| {}));
        assert!(instance.off(EVENT_CHANNEL, a));
        assert!(!instance.off(EVENT_CHANNEL, a));
        assert_eq!(instance.listener_count(EVENT_CHANNEL), 1);
    }

    #[test]
    fn subscription_unregisters_on_drop() {
        let (instance, _rx) = SocketInstance::new();
        {
            let _sub = Subscription::acquire(&instance, EVENT_CHANNEL, Box::new(|_| {}));
            assert_eq!(instance.listener_count(EVENT_CHANNEL), 1);
        }
        assert_eq!(instance.listener_count(EVENT_CHANNEL), 0);
    }

    #[test]
    fn subscription_release_is_explicit() {
        let (instance, _rx) = SocketInstance::new();
        let sub = Subscription::acquire(&instance, EVENT_CHANNEL, Box::new(|_| {}));
        sub.release();
        assert_eq!(instance.listener_count(EVENT_CHANNEL), 0);
    }

    #[test]
    fn emit_queues_outbound_frames_in_order() {
        let (instance, mut rx) = SocketInstance::new();
        assert!(instance.emit("command", "say one"));
        assert!(instance.emit("command", "say two"));
        assert_eq!(rx.try_recv().unwrap().payload, "say one");
        assert_eq!(rx.try_recv().unwrap().payload, "say two");
    }

    #[test]
    fn emit_after_receiver_dropped_fails() {
        let (instance, rx) = SocketInstance::new();
        drop(rx);
        assert!(!instance.emit("command", "list"));
    }

    #[test]
    fn instances_compare_by_identity() {
        let (a, _ra) = SocketInstance::new();
        let (b, _rb) = SocketInstance::new();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
