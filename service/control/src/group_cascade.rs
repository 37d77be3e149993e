use std::sync::{Arc, Weak};

use anyhow::Context;
use domain_control::{
    model::vo::{ControlEvent, EventFamily, EventPayload, GroupEvent},
    service::{ControlStateService, EventBus, EventHandler, SubscriptionId},
};

/// Expands group-scoped control events into job-scoped registry requests for every
/// member of the group's current batch.
///
/// Holds the registry weakly: the registry owns the bus that owns this handler.
pub struct GroupCascadeHandler {
    registry: Weak<dyn ControlStateService>,
}

impl GroupCascadeHandler {
    pub fn new(registry: &Arc<dyn ControlStateService>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }

    pub fn subscribe_to(self: Arc<Self>, bus: &dyn EventBus) -> SubscriptionId {
        bus.subscribe(EventFamily::Group.into(), self)
    }
}

impl EventHandler for GroupCascadeHandler {
    fn name(&self) -> &str {
        "group-cascade"
    }

    fn handle(&self, event: &ControlEvent) -> anyhow::Result<()> {
        let EventPayload::Group(group_event) = event.payload() else {
            return Ok(());
        };
        let Some(registry) = self.registry.upgrade() else {
            tracing::debug!("Registry dropped, group cascade skipped");
            return Ok(());
        };
        let group_name = group_event.group_name();
        let members = registry.group_members(group_name);
        if members.is_empty() {
            tracing::debug!(group_name, "Group has no registered members");
            return Ok(());
        }
        tracing::info!(group_name, members = members.len(), kind = ?event.kind(), "Cascading to group members");
        for job_code in &members {
            match group_event {
                GroupEvent::Paused { .. } => registry.request_pause(job_code),
                GroupEvent::Resumed { .. } => registry.request_resume(job_code),
                GroupEvent::Stopped { reason, .. } => registry.request_stop(job_code, reason),
                GroupEvent::Cancelled { strategy, .. } => {
                    registry.request_cancel(job_code, strategy)
                }
                GroupEvent::CancelledCompleted { .. } => {
                    registry.clear(job_code);
                    Ok(())
                }
            }
            .with_context(|| format!("Cascade of group {group_name} to job {job_code}"))?;
        }
        Ok(())
    }
}
