use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::vo::{JobExecutionStatus, TerminalStatus};

/// Aggregated progress of one batch.
///
/// At every consistent observation point
/// `running + completed + failed + paused + stopped + cancelled == total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatistics {
    pub batch_no: String,
    pub total_jobs: u64,
    pub running_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub paused_jobs: u64,
    pub stopped_jobs: u64,
    pub cancelled_jobs: u64,
    /// `completed_jobs / total_jobs`, 0 for an empty batch.
    pub success_rate: f64,
    pub last_update_time: DateTime<Utc>,
    /// Source of the last event applied to this batch.
    pub data_source: Option<String>,
}

impl BatchStatistics {
    /// Empty statistics whose clock starts at `created_at`.
    pub fn new(batch_no: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            batch_no: batch_no.into(),
            total_jobs: 0,
            running_jobs: 0,
            completed_jobs: 0,
            failed_jobs: 0,
            paused_jobs: 0,
            stopped_jobs: 0,
            cancelled_jobs: 0,
            success_rate: 0.0,
            last_update_time: created_at,
            data_source: None,
        }
    }

    pub fn register_job(&mut self) {
        self.total_jobs += 1;
        self.running_jobs += 1;
        self.recompute_success_rate();
    }

    pub fn pause_job(&mut self) {
        self.running_jobs = self.running_jobs.saturating_sub(1);
        self.paused_jobs += 1;
    }

    pub fn resume_job(&mut self) {
        self.paused_jobs = self.paused_jobs.saturating_sub(1);
        self.running_jobs += 1;
    }

    /// Move one job from `previous` into the counter of `status`.
    ///
    /// A job that is already terminal is left untouched.
    pub fn complete_job(&mut self, previous: JobExecutionStatus, status: TerminalStatus) {
        match previous {
            JobExecutionStatus::Running => {
                self.running_jobs = self.running_jobs.saturating_sub(1)
            }
            JobExecutionStatus::Paused => self.paused_jobs = self.paused_jobs.saturating_sub(1),
            JobExecutionStatus::Terminal(_) => return,
        }
        match status {
            TerminalStatus::Success => self.completed_jobs += 1,
            TerminalStatus::Failed => self.failed_jobs += 1,
            TerminalStatus::Stopped => self.stopped_jobs += 1,
            TerminalStatus::Cancelled => self.cancelled_jobs += 1,
        }
        self.recompute_success_rate();
    }

    /// Record who touched the batch and when, never moving time backwards.
    pub fn touch(&mut self, at: DateTime<Utc>, source: &str) {
        if at > self.last_update_time {
            self.last_update_time = at;
        }
        self.data_source = Some(source.to_owned());
    }

    pub fn finished_jobs(&self) -> u64 {
        self.completed_jobs + self.failed_jobs + self.stopped_jobs + self.cancelled_jobs
    }

    /// Fraction of jobs that reached a terminal status.
    pub fn progress(&self) -> f64 {
        if self.total_jobs == 0 {
            return 0.0;
        }
        self.finished_jobs() as f64 / self.total_jobs as f64
    }

    pub fn is_finished(&self) -> bool {
        self.total_jobs > 0 && self.finished_jobs() == self.total_jobs
    }

    pub fn is_consistent(&self) -> bool {
        self.running_jobs + self.paused_jobs + self.finished_jobs() == self.total_jobs
    }

    fn recompute_success_rate(&mut self) {
        self.success_rate = if self.total_jobs > 0 {
            self.completed_jobs as f64 / self.total_jobs as f64
        } else {
            0.0
        };
    }
}
