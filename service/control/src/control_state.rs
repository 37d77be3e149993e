use std::sync::{Arc, Weak};

use dashmap::DashMap;
use domain_control::{
    exception::{ControlException, ControlResult},
    model::{
        entity::ControlState,
        vo::{
            Checkpoint, ControlEvent, EventFamily, EventPayload, GroupEvent, JobEvent, QueryType,
        },
    },
    service::{handler_fn, ControlStateService, EventBus, SubscriptionId},
};
use typed_builder::TypedBuilder;

pub const DEFAULT_SOURCE: &str = "control-service";

/// Concurrent control-state registry.
///
/// Entries live in sharded maps, so requests for one job code are serialized while
/// unrelated jobs never contend. Events are published only after the entry guard is
/// released.
#[derive(TypedBuilder)]
pub struct ControlStateRegistryImpl {
    event_bus: Arc<dyn EventBus>,
    /// Source tag stamped on every event the registry issues.
    #[builder(default = DEFAULT_SOURCE.to_owned(), setter(into))]
    source: String,
    #[builder(default, setter(skip))]
    jobs: DashMap<String, ControlState>,
    #[builder(default, setter(skip))]
    groups: DashMap<String, ControlState>,
    #[builder(default, setter(skip))]
    group_batches: DashMap<String, GroupBatch>,
}

#[derive(Debug, Clone, Default)]
struct GroupBatch {
    batch_no: String,
    members: Vec<String>,
}

impl ControlStateRegistryImpl {
    /// Track group membership from execution lifecycle events.
    ///
    /// A registration joins the group's current batch, a completion leaves it.
    pub fn subscribe_to(self: &Arc<Self>) -> SubscriptionId {
        let registry: Weak<Self> = Arc::downgrade(self);
        self.event_bus.subscribe(
            EventFamily::Job.into(),
            handler_fn("group-membership", move |event| {
                let Some(registry) = registry.upgrade() else {
                    return Ok(());
                };
                match event.payload() {
                    EventPayload::Job(JobEvent::ExecutionRegistered { .. }) => {
                        registry.record_membership(event)
                    }
                    EventPayload::Job(JobEvent::ExecutionCompleted {
                        job_code, batch_no, ..
                    }) => registry.release_membership(job_code, batch_no),
                    _ => {}
                }
                Ok(())
            }),
        )
    }

    fn release_membership(&self, job_code: &str, batch_no: &str) {
        for mut group in self.group_batches.iter_mut() {
            if group.batch_no != batch_no {
                continue;
            }
            let before = group.members.len();
            group.members.retain(|member| member != job_code);
            if group.members.len() < before {
                tracing::debug!(group_name = %group.key(), job_code, batch_no, "Finished job left its group");
            }
        }
    }

    fn record_membership(&self, event: &ControlEvent) {
        let (Some(group_name), Some(job_code), Some(batch_no)) =
            (event.group_name(), event.job_code(), event.batch_no())
        else {
            return;
        };
        let mut group = self.group_batches.entry(group_name.to_owned()).or_default();
        if group.batch_no != batch_no {
            tracing::debug!(group_name, batch_no, previous = %group.batch_no, "Group moved to a new batch");
            group.batch_no = batch_no.to_owned();
            group.members.clear();
        }
        if !group.members.iter().any(|member| member == job_code) {
            group.members.push(job_code.to_owned());
        }
    }

    fn update_job(&self, job_code: &str, f: impl FnOnce(&mut ControlState)) -> ControlResult<()> {
        validate("job_code", job_code)?;
        f(self.jobs.entry(job_code.to_owned()).or_default().value_mut());
        Ok(())
    }

    fn update_group(
        &self,
        group_name: &str,
        f: impl FnOnce(&mut ControlState),
    ) -> ControlResult<()> {
        validate("group_name", group_name)?;
        f(self.groups.entry(group_name.to_owned()).or_default().value_mut());
        Ok(())
    }

    fn read_job<T>(&self, job_code: &str, f: impl FnOnce(&ControlState) -> T) -> Option<T> {
        self.jobs.get(job_code).map(|state| f(state.value()))
    }

    fn publish(&self, event: impl Into<EventPayload>) {
        self.event_bus.publish(ControlEvent::new(self.source.as_str(), event));
    }
}

impl ControlStateService for ControlStateRegistryImpl {
    fn request_pause(&self, job_code: &str) -> ControlResult<()> {
        self.update_job(job_code, ControlState::request_pause)?;
        tracing::info!(job_code, "Pause requested");
        self.publish(JobEvent::Paused {
            job_code: job_code.to_owned(),
        });
        Ok(())
    }

    fn request_resume(&self, job_code: &str) -> ControlResult<()> {
        self.update_job(job_code, ControlState::request_resume)?;
        tracing::info!(job_code, "Resume requested");
        self.publish(JobEvent::Resumed {
            job_code: job_code.to_owned(),
        });
        Ok(())
    }

    fn request_stop(&self, job_code: &str, reason: &str) -> ControlResult<()> {
        self.update_job(job_code, |state| state.request_stop(reason))?;
        tracing::info!(job_code, reason, "Stop requested");
        self.publish(JobEvent::Stopped {
            job_code: job_code.to_owned(),
            reason: reason.to_owned(),
        });
        Ok(())
    }

    fn request_cancel(&self, job_code: &str, strategy: &str) -> ControlResult<()> {
        self.update_job(job_code, |state| state.request_cancel(strategy))?;
        tracing::info!(job_code, strategy, "Cancel requested");
        self.publish(JobEvent::Cancelled {
            job_code: job_code.to_owned(),
            strategy: strategy.to_owned(),
        });
        Ok(())
    }

    fn request_start(&self, job_code: &str, batch_no: &str) -> ControlResult<()> {
        validate("job_code", job_code)?;
        validate("batch_no", batch_no)?;
        if let Some((_, stale)) = self.jobs.remove(job_code) {
            tracing::debug!(job_code, ?stale, "Dropped intents of a previous execution");
        }
        tracing::info!(job_code, batch_no, "Start requested");
        self.publish(JobEvent::Started {
            job_code: job_code.to_owned(),
            batch_no: batch_no.to_owned(),
        });
        Ok(())
    }

    fn request_group_pause(&self, group_name: &str) -> ControlResult<()> {
        self.update_group(group_name, ControlState::request_pause)?;
        tracing::info!(group_name, "Group pause requested");
        self.publish(GroupEvent::Paused {
            group_name: group_name.to_owned(),
        });
        Ok(())
    }

    fn request_group_resume(&self, group_name: &str) -> ControlResult<()> {
        self.update_group(group_name, ControlState::request_resume)?;
        tracing::info!(group_name, "Group resume requested");
        self.publish(GroupEvent::Resumed {
            group_name: group_name.to_owned(),
        });
        Ok(())
    }

    fn request_group_stop(&self, group_name: &str, reason: &str) -> ControlResult<()> {
        self.update_group(group_name, |state| state.request_stop(reason))?;
        tracing::info!(group_name, reason, "Group stop requested");
        self.publish(GroupEvent::Stopped {
            group_name: group_name.to_owned(),
            reason: reason.to_owned(),
        });
        Ok(())
    }

    fn request_group_cancel(&self, group_name: &str, strategy: &str) -> ControlResult<()> {
        self.update_group(group_name, |state| state.request_cancel(strategy))?;
        tracing::info!(group_name, strategy, "Group cancel requested");
        self.publish(GroupEvent::Cancelled {
            group_name: group_name.to_owned(),
            strategy: strategy.to_owned(),
        });
        Ok(())
    }

    fn complete_group_cancel(&self, group_name: &str) -> ControlResult<()> {
        validate("group_name", group_name)?;
        self.groups.remove(group_name);
        tracing::info!(group_name, "Group cancel completed");
        self.publish(GroupEvent::CancelledCompleted {
            group_name: group_name.to_owned(),
        });
        Ok(())
    }

    fn is_pause_requested(&self, job_code: &str) -> bool {
        self.read_job(job_code, |state| state.pause_requested).unwrap_or_default()
    }

    fn is_stop_requested(&self, job_code: &str) -> bool {
        self.read_job(job_code, |state| state.stop_requested).unwrap_or_default()
    }

    fn is_cancel_requested(&self, job_code: &str) -> Option<String> {
        self.read_job(job_code, |state| state.cancel_strategy.clone()).flatten()
    }

    fn query_status(&self, job_code: &str, query_type: QueryType) -> bool {
        let requested = match query_type {
            QueryType::Pause => self.is_pause_requested(job_code),
            QueryType::Stop => self.is_stop_requested(job_code),
        };
        self.publish(JobEvent::StatusQuery {
            job_code: job_code.to_owned(),
            query_type,
        });
        requested
    }

    fn checkpoint(&self, job_code: &str) -> Checkpoint {
        self.read_job(job_code, ControlState::checkpoint).unwrap_or(Checkpoint::Continue)
    }

    fn job_state(&self, job_code: &str) -> Option<ControlState> {
        self.read_job(job_code, ControlState::clone)
    }

    fn group_state(&self, group_name: &str) -> Option<ControlState> {
        self.groups.get(group_name).map(|state| state.clone())
    }

    fn group_members(&self, group_name: &str) -> Vec<String> {
        self.group_batches
            .get(group_name)
            .map(|group| group.members.clone())
            .unwrap_or_default()
    }

    fn clear(&self, job_code: &str) {
        if self.jobs.remove(job_code).is_some() {
            tracing::debug!(job_code, "Control state cleared");
        }
    }

    fn clear_group(&self, group_name: &str) {
        if self.groups.remove(group_name).is_some() {
            tracing::debug!(group_name, "Group control state cleared");
        }
    }
}

fn validate(field: &'static str, value: &str) -> ControlResult<()> {
    if value.trim().is_empty() {
        return Err(ControlException::invalid_argument(field, value, "must not be empty"));
    }
    Ok(())
}
