//! Control events: immutable facts about control intents and job lifecycle.
//!
//! Every event is wrapped in a [`ControlEvent`] envelope that assigns a unique id and a
//! creation timestamp at construction. The payload is a closed set of variants split
//! in two families, job-scoped and group-scoped, so subscribers can match
//! exhaustively or filter by family.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::status::{QueryType, TerminalStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlEvent {
    event_id: Uuid,
    timestamp: DateTime<Utc>,
    source: String,
    payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventPayload {
    Job(JobEvent),
    Group(GroupEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum JobEvent {
    Paused {
        job_code: String,
    },
    Resumed {
        job_code: String,
    },
    Stopped {
        job_code: String,
        reason: String,
    },
    Cancelled {
        job_code: String,
        strategy: String,
    },
    Started {
        job_code: String,
        batch_no: String,
    },
    ExecutionRegistered {
        job_code: String,
        batch_no: String,
        group_name: Option<String>,
    },
    ExecutionCompleted {
        job_code: String,
        batch_no: String,
        status: TerminalStatus,
    },
    StatusQuery {
        job_code: String,
        query_type: QueryType,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GroupEvent {
    Paused { group_name: String },
    Resumed { group_name: String },
    Stopped { group_name: String, reason: String },
    Cancelled { group_name: String, strategy: String },
    CancelledCompleted { group_name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventFamily {
    Job,
    Group,
}

/// Payload-free discriminant of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    JobPaused,
    JobResumed,
    JobStopped,
    JobCancelled,
    JobStarted,
    JobExecutionRegistered,
    JobExecutionCompleted,
    JobStatusQuery,
    GroupPaused,
    GroupResumed,
    GroupStopped,
    GroupCancelled,
    GroupCancelledCompleted,
}

/// Subscription filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Any,
    Family(EventFamily),
    Kind(EventKind),
}

impl ControlEvent {
    /// Create an event; id and timestamp are assigned here and never change.
    pub fn new(source: impl Into<String>, payload: impl Into<EventPayload>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload: payload.into(),
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn family(&self) -> EventFamily {
        self.kind().family()
    }

    pub fn job_code(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Job(event) => Some(event.job_code()),
            EventPayload::Group(_) => None,
        }
    }

    /// Group of a group-scoped event, or the group a job execution was registered
    /// under.
    pub fn group_name(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Group(event) => Some(event.group_name()),
            EventPayload::Job(JobEvent::ExecutionRegistered { group_name, .. }) => {
                group_name.as_deref()
            }
            EventPayload::Job(_) => None,
        }
    }

    pub fn batch_no(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Job(
                JobEvent::Started { batch_no, .. }
                | JobEvent::ExecutionRegistered { batch_no, .. }
                | JobEvent::ExecutionCompleted { batch_no, .. },
            ) => Some(batch_no.as_str()),
            _ => None,
        }
    }
}

/// Two events are the same occurrence iff their ids match.
impl PartialEq for ControlEvent {
    fn eq(&self, other: &Self) -> bool {
        self.event_id == other.event_id
    }
}

impl Eq for ControlEvent {}

impl Hash for ControlEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.event_id.hash(state);
    }
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject = match &self.payload {
            EventPayload::Job(event) => event.job_code(),
            EventPayload::Group(event) => event.group_name(),
        };
        write!(f, "{:?}({subject}) from {} [{}]", self.kind(), self.source, self.event_id)
    }
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Job(event) => event.kind(),
            EventPayload::Group(event) => event.kind(),
        }
    }
}

impl From<JobEvent> for EventPayload {
    fn from(event: JobEvent) -> Self {
        EventPayload::Job(event)
    }
}

impl From<GroupEvent> for EventPayload {
    fn from(event: GroupEvent) -> Self {
        EventPayload::Group(event)
    }
}

impl JobEvent {
    pub fn job_code(&self) -> &str {
        match self {
            JobEvent::Paused { job_code }
            | JobEvent::Resumed { job_code }
            | JobEvent::Stopped { job_code, .. }
            | JobEvent::Cancelled { job_code, .. }
            | JobEvent::Started { job_code, .. }
            | JobEvent::ExecutionRegistered { job_code, .. }
            | JobEvent::ExecutionCompleted { job_code, .. }
            | JobEvent::StatusQuery { job_code, .. } => job_code.as_str(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            JobEvent::Paused { .. } => EventKind::JobPaused,
            JobEvent::Resumed { .. } => EventKind::JobResumed,
            JobEvent::Stopped { .. } => EventKind::JobStopped,
            JobEvent::Cancelled { .. } => EventKind::JobCancelled,
            JobEvent::Started { .. } => EventKind::JobStarted,
            JobEvent::ExecutionRegistered { .. } => EventKind::JobExecutionRegistered,
            JobEvent::ExecutionCompleted { .. } => EventKind::JobExecutionCompleted,
            JobEvent::StatusQuery { .. } => EventKind::JobStatusQuery,
        }
    }
}

impl GroupEvent {
    pub fn group_name(&self) -> &str {
        match self {
            GroupEvent::Paused { group_name }
            | GroupEvent::Resumed { group_name }
            | GroupEvent::Stopped { group_name, .. }
            | GroupEvent::Cancelled { group_name, .. }
            | GroupEvent::CancelledCompleted { group_name } => group_name.as_str(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            GroupEvent::Paused { .. } => EventKind::GroupPaused,
            GroupEvent::Resumed { .. } => EventKind::GroupResumed,
            GroupEvent::Stopped { .. } => EventKind::GroupStopped,
            GroupEvent::Cancelled { .. } => EventKind::GroupCancelled,
            GroupEvent::CancelledCompleted { .. } => EventKind::GroupCancelledCompleted,
        }
    }
}

impl EventKind {
    pub fn family(&self) -> EventFamily {
        use EventKind::*;
        match self {
            JobPaused | JobResumed | JobStopped | JobCancelled | JobStarted
            | JobExecutionRegistered | JobExecutionCompleted | JobStatusQuery => EventFamily::Job,
            GroupPaused | GroupResumed | GroupStopped | GroupCancelled
            | GroupCancelledCompleted => EventFamily::Group,
        }
    }
}

impl EventType {
    pub fn matches(&self, event: &ControlEvent) -> bool {
        match self {
            EventType::Any => true,
            EventType::Family(family) => event.family() == *family,
            EventType::Kind(kind) => event.kind() == *kind,
        }
    }
}

impl From<EventKind> for EventType {
    fn from(kind: EventKind) -> Self {
        EventType::Kind(kind)
    }
}

impl From<EventFamily> for EventType {
    fn from(family: EventFamily) -> Self {
        EventType::Family(family)
    }
}
