use crate::{
    exception::ControlResult,
    model::{
        entity::ControlState,
        vo::{Checkpoint, QueryType},
    },
};

/// Process-wide record of control intents per job code and per group name.
///
/// Requests are idempotent and create entries lazily, so a request against an
/// unknown job code succeeds. Only empty identifiers are rejected. Nothing here
/// interrupts a running job: the execution runtime polls at its checkpoints.
pub trait ControlStateService: Send + Sync {
    fn request_pause(&self, job_code: &str) -> ControlResult<()>;

    fn request_resume(&self, job_code: &str) -> ControlResult<()>;

    fn request_stop(&self, job_code: &str, reason: &str) -> ControlResult<()>;

    fn request_cancel(&self, job_code: &str, strategy: &str) -> ControlResult<()>;

    /// Drop stale intents left by a previous execution and announce the start.
    fn request_start(&self, job_code: &str, batch_no: &str) -> ControlResult<()>;

    fn request_group_pause(&self, group_name: &str) -> ControlResult<()>;

    fn request_group_resume(&self, group_name: &str) -> ControlResult<()>;

    fn request_group_stop(&self, group_name: &str, reason: &str) -> ControlResult<()>;

    fn request_group_cancel(&self, group_name: &str, strategy: &str) -> ControlResult<()>;

    /// Clear the group's intents once every member honoured the cancel.
    fn complete_group_cancel(&self, group_name: &str) -> ControlResult<()>;

    fn is_pause_requested(&self, job_code: &str) -> bool;

    fn is_stop_requested(&self, job_code: &str) -> bool;

    /// The cancel strategy, if a cancel was requested.
    fn is_cancel_requested(&self, job_code: &str) -> Option<String>;

    /// Same answer as the matching `is_*_requested`, announced as a `JobStatusQuery`.
    fn query_status(&self, job_code: &str, query_type: QueryType) -> bool;

    fn checkpoint(&self, job_code: &str) -> Checkpoint;

    fn job_state(&self, job_code: &str) -> Option<ControlState>;

    fn group_state(&self, group_name: &str) -> Option<ControlState>;

    /// Job codes registered under the group's most recent batch.
    fn group_members(&self, group_name: &str) -> Vec<String>;

    /// Reset a job after its execution reached a terminal state.
    fn clear(&self, job_code: &str);

    fn clear_group(&self, group_name: &str);
}
