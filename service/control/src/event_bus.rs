use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use domain_control::{
    model::vo::{ControlEvent, EventType},
    service::{EventBus, EventHandler, SubscriptionId},
};

/// Synchronous dispatch table.
///
/// `publish` runs every matching handler on the caller's thread: first `Any`
/// subscribers, then the event's family, then its exact kind, each group in
/// registration order. A handler that fails or panics is reported and skipped.
#[derive(Default)]
pub struct EventBusImpl {
    subscriptions: DashMap<EventType, Vec<Subscription>>,
    failed_deliveries: AtomicU64,
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
}

impl EventBusImpl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward matching events into a channel, for consumers running on their own
    /// task.
    pub fn subscribe_channel(
        &self,
        event_type: EventType,
    ) -> (SubscriptionId, flume::Receiver<ControlEvent>) {
        let (sender, receiver) = flume::unbounded();
        let id = self.subscribe(event_type, Arc::new(ChannelHandler { sender }));
        (id, receiver)
    }

    /// Number of deliveries that returned an error or panicked.
    pub fn failed_deliveries(&self) -> u64 {
        self.failed_deliveries.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.iter().map(|entry| entry.value().len()).sum()
    }

    fn handlers_for(&self, event: &ControlEvent) -> Vec<Arc<dyn EventHandler>> {
        let mut handlers = vec![];
        for event_type in [
            EventType::Any,
            EventType::Family(event.family()),
            EventType::Kind(event.kind()),
        ] {
            if let Some(subscriptions) = self.subscriptions.get(&event_type) {
                handlers.extend(subscriptions.iter().map(|s| s.handler.clone()));
            }
        }
        handlers
    }

    fn deliver(&self, handler: &dyn EventHandler, event: &ControlEvent) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event)));
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => format!("{e:#}"),
            Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
        };
        self.failed_deliveries.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            handler = handler.name(),
            event_id = %event.event_id(),
            kind = ?event.kind(),
            "Event handler failed: {failure}"
        );
    }
}

impl EventBus for EventBusImpl {
    fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId::new();
        tracing::debug!(%id, ?event_type, handler = handler.name(), "Subscribed");
        self.subscriptions.entry(event_type).or_default().push(Subscription { id, handler });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for mut entry in self.subscriptions.iter_mut() {
            let before = entry.len();
            entry.retain(|s| s.id != id);
            removed |= entry.len() != before;
        }
        removed
    }

    fn publish(&self, event: ControlEvent) {
        // Handlers are collected first so none runs under a map guard and a handler
        // may publish or subscribe in turn.
        let handlers = self.handlers_for(&event);
        if handlers.is_empty() {
            tracing::trace!(event_id = %event.event_id(), "No subscriber for {event}");
            return;
        }
        for handler in handlers {
            self.deliver(handler.as_ref(), &event);
        }
    }
}

struct ChannelHandler {
    sender: flume::Sender<ControlEvent>,
}

impl EventHandler for ChannelHandler {
    fn name(&self) -> &str {
        "channel"
    }

    fn handle(&self, event: &ControlEvent) -> anyhow::Result<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| anyhow::anyhow!("Channel receiver dropped"))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
