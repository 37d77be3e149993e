pub mod event;
pub mod key;
pub mod status;

#[rustfmt::skip]
pub use {
    event::{ControlEvent, EventFamily, EventKind, EventPayload, EventType, GroupEvent, JobEvent},
    status::{Checkpoint, JobExecutionStatus, QueryType, TerminalStatus},
};
