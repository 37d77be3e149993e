use std::{fmt, sync::Arc};

use uuid::Uuid;

use crate::model::vo::{ControlEvent, EventType};

/// Reacts to published control events.
///
/// Errors are reported by the bus and never reach the publisher.
pub trait EventHandler: Send + Sync {
    /// Name used when reporting delivery failures.
    fn name(&self) -> &str;

    fn handle(&self, event: &ControlEvent) -> anyhow::Result<()>;
}

/// In-process publish/subscribe between the component issuing a control decision and
/// the components reacting to it.
pub trait EventBus: Send + Sync {
    /// Register `handler` for every event matching `event_type`.
    fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventHandler>) -> SubscriptionId;

    /// Returns whether a subscription was removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Deliver to every current subscriber; publishing with no subscriber is a no-op.
    fn publish(&self, event: ControlEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handler backed by a closure.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&ControlEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, event: &ControlEvent) -> anyhow::Result<()> {
        (self.f)(event)
    }
}

pub fn handler_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn EventHandler>
where
    F: Fn(&ControlEvent) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnHandler {
        name: name.into(),
        f,
    })
}
