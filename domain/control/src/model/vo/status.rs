use std::fmt;

use serde::{Deserialize, Serialize};

/// Status from which a job execution makes no further transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminalStatus {
    Success,
    Failed,
    Stopped,
    Cancelled,
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalStatus::Success => write!(f, "success"),
            TerminalStatus::Failed => write!(f, "failed"),
            TerminalStatus::Stopped => write!(f, "stopped"),
            TerminalStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Which control flag a status query asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryType {
    Pause,
    Stop,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Pause => write!(f, "pause"),
            QueryType::Stop => write!(f, "stop"),
        }
    }
}

/// State of a single job execution inside a batch, as seen by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobExecutionStatus {
    Running,
    Paused,
    Terminal(TerminalStatus),
}

impl JobExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobExecutionStatus::Terminal(_))
    }
}

/// What the execution runtime should do at a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    Pause,
    Stop,
    /// Carries the caller-chosen strategy for partially applied side effects.
    Cancel(String),
}

impl Checkpoint {
    pub fn should_continue(&self) -> bool {
        matches!(self, Checkpoint::Continue)
    }
}
