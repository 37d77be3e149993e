use std::sync::Arc;

use domain_control::{
    model::vo::{ControlEvent, EventPayload, EventType},
    service::{EventBus, EventHandler, SubscriptionId},
};

/// Writes every control event to the `audit` tracing target.
#[derive(Default)]
pub struct AuditLogHandler;

impl AuditLogHandler {
    pub fn subscribe_to(bus: &dyn EventBus) -> SubscriptionId {
        bus.subscribe(EventType::Any, Arc::new(Self))
    }

    fn subject(event: &ControlEvent) -> &str {
        match event.payload() {
            EventPayload::Job(job_event) => job_event.job_code(),
            EventPayload::Group(group_event) => group_event.group_name(),
        }
    }
}

impl EventHandler for AuditLogHandler {
    fn name(&self) -> &str {
        "audit-log"
    }

    fn handle(&self, event: &ControlEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event.payload())?;
        tracing::info!(
            target: "audit",
            event_id = %event.event_id(),
            kind = ?event.kind(),
            source = event.source(),
            subject = Self::subject(event),
            timestamp = %event.timestamp(),
            "{payload}"
        );
        Ok(())
    }
}
