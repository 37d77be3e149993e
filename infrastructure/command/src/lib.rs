//! Operator commands accepted by the control plane.
//!
//! Commands arrive as JSON from an outer layer (HTTP handler, message queue, stdin)
//! and are dispatched by the control plane to the registry or the aggregator.

use domain_control::model::vo::TerminalStatus;
use serde::{Deserialize, Serialize};

/// What a control command applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlTarget {
    /// A single job, by job code.
    Job(String),
    /// Every member of a group, by group name.
    Group(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControlCommand {
    Pause {
        target: ControlTarget,
    },
    Resume {
        target: ControlTarget,
    },
    Stop {
        target: ControlTarget,
        #[serde(default)]
        reason: String,
    },
    Cancel {
        target: ControlTarget,
        strategy: String,
    },
    /// Announce a new execution of a job in a batch.
    Start {
        job_code: String,
        batch_no: String,
    },
    Clear {
        target: ControlTarget,
    },
    CompleteGroupCancel {
        group_name: String,
    },
    /// Lifecycle fact reported by the execution runtime.
    ///
    /// `source` names the reporter; the control plane's own source is used when absent.
    Register {
        job_code: String,
        batch_no: String,
        #[serde(default)]
        group_name: Option<String>,
        #[serde(default)]
        source: Option<String>,
    },
    /// Lifecycle fact reported by the execution runtime.
    Complete {
        job_code: String,
        batch_no: String,
        status: TerminalStatus,
        #[serde(default)]
        source: Option<String>,
    },
    Statistics {
        batch_no: String,
    },
}

impl ControlCommand {
    /// Name of the action, as it appears in the `action` tag.
    pub fn action(&self) -> &'static str {
        match self {
            ControlCommand::Pause { .. } => "pause",
            ControlCommand::Resume { .. } => "resume",
            ControlCommand::Stop { .. } => "stop",
            ControlCommand::Cancel { .. } => "cancel",
            ControlCommand::Start { .. } => "start",
            ControlCommand::Clear { .. } => "clear",
            ControlCommand::CompleteGroupCancel { .. } => "completeGroupCancel",
            ControlCommand::Register { .. } => "register",
            ControlCommand::Complete { .. } => "complete",
            ControlCommand::Statistics { .. } => "statistics",
        }
    }
}
