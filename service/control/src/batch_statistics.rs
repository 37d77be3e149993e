use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domain_control::{
    model::{
        entity::BatchStatistics,
        vo::{
            ControlEvent, EventFamily, EventPayload, EventType, JobEvent, JobExecutionStatus,
            TerminalStatus,
        },
    },
    service::{BatchStatisticsService, EventBus, EventHandler, SubscriptionId},
};

/// In-memory aggregator keyed by batch number.
///
/// Each batch record is only mutated under its map entry guard, so the steps of one
/// update are never interleaved with another update of the same batch while
/// unrelated batches proceed in parallel.
#[derive(Default)]
pub struct BatchStatisticsServiceImpl {
    batches: DashMap<String, BatchRecord>,
    /// Batch each job code was last registered under.
    job_batches: DashMap<String, String>,
}

struct BatchRecord {
    statistics: BatchStatistics,
    jobs: HashMap<String, JobExecutionStatus>,
}

enum Move {
    Pause,
    Resume,
}

impl BatchStatisticsServiceImpl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the aggregator with every job-scoped event published on `bus`.
    pub fn subscribe_to(self: &Arc<Self>, bus: &dyn EventBus) -> SubscriptionId {
        bus.subscribe(EventType::Family(EventFamily::Job), self.clone())
    }

    fn register(&self, event: &ControlEvent, job_code: &str, batch_no: &str) {
        if job_code.is_empty() || batch_no.is_empty() {
            tracing::warn!(job_code, batch_no, "Ignoring registration without job code or batch");
            return;
        }
        {
            let mut record = self
                .batches
                .entry(batch_no.to_owned())
                .or_insert_with(|| BatchRecord::new(batch_no, event.timestamp()));
            let record = &mut *record;
            if record.jobs.contains_key(job_code) {
                tracing::debug!(job_code, batch_no, "Job already registered in batch");
            } else {
                record.jobs.insert(job_code.to_owned(), JobExecutionStatus::Running);
                record.statistics.register_job();
            }
            record.statistics.touch(event.timestamp(), event.source());
        }
        self.job_batches.insert(job_code.to_owned(), batch_no.to_owned());
    }

    fn complete(&self, event: &ControlEvent, job_code: &str, batch_no: &str, status: TerminalStatus) {
        let Some(mut record) = self.batches.get_mut(batch_no) else {
            tracing::warn!(job_code, batch_no, %status, "Completion for an unregistered batch ignored");
            return;
        };
        let record = &mut *record;
        let Some(state) = record.jobs.get_mut(job_code) else {
            tracing::warn!(job_code, batch_no, %status, "Completion for a job not registered in batch ignored");
            return;
        };
        if state.is_terminal() {
            tracing::debug!(job_code, batch_no, previous = ?state, "Duplicate completion ignored");
            return;
        }
        record.statistics.complete_job(*state, status);
        *state = JobExecutionStatus::Terminal(status);
        record.statistics.touch(event.timestamp(), event.source());
    }

    fn move_job(&self, event: &ControlEvent, job_code: &str, movement: Move) {
        let Some(batch_no) = self.job_batches.get(job_code).map(|b| b.value().to_owned()) else {
            tracing::debug!(job_code, "Job is not registered in any batch");
            return;
        };
        let Some(mut record) = self.batches.get_mut(&batch_no) else {
            return;
        };
        let record = &mut *record;
        let Some(state) = record.jobs.get_mut(job_code) else {
            return;
        };
        match (*state, movement) {
            (JobExecutionStatus::Running, Move::Pause) => {
                *state = JobExecutionStatus::Paused;
                record.statistics.pause_job();
            }
            (JobExecutionStatus::Paused, Move::Resume) => {
                *state = JobExecutionStatus::Running;
                record.statistics.resume_job();
            }
            (current, _) => {
                tracing::debug!(job_code, %batch_no, ?current, "No counter to move");
                return;
            }
        }
        record.statistics.touch(event.timestamp(), event.source());
    }
}

impl BatchRecord {
    fn new(batch_no: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            statistics: BatchStatistics::new(batch_no, created_at),
            jobs: HashMap::new(),
        }
    }
}

impl BatchStatisticsService for BatchStatisticsServiceImpl {
    fn apply(&self, event: &ControlEvent) {
        let EventPayload::Job(job_event) = event.payload() else {
            return;
        };
        match job_event {
            JobEvent::ExecutionRegistered {
                job_code, batch_no, ..
            } => self.register(event, job_code, batch_no),
            JobEvent::ExecutionCompleted {
                job_code,
                batch_no,
                status,
            } => self.complete(event, job_code, batch_no, *status),
            JobEvent::Paused { job_code } => self.move_job(event, job_code, Move::Pause),
            JobEvent::Resumed { job_code } => self.move_job(event, job_code, Move::Resume),
            _ => {}
        }
    }

    fn get_statistics(&self, batch_no: &str) -> Option<BatchStatistics> {
        self.batches.get(batch_no).map(|record| record.statistics.clone())
    }

    fn evict(&self, batch_no: &str) -> Option<BatchStatistics> {
        let (_, record) = self.batches.remove(batch_no)?;
        self.job_batches.retain(|_, batch| batch != batch_no);
        Some(record.statistics)
    }

    fn batches(&self) -> Vec<String> {
        let mut batches: Vec<String> = self.batches.iter().map(|e| e.key().to_owned()).collect();
        batches.sort();
        batches
    }
}

impl EventHandler for BatchStatisticsServiceImpl {
    fn name(&self) -> &str {
        "batch-statistics"
    }

    fn handle(&self, event: &ControlEvent) -> anyhow::Result<()> {
        self.apply(event);
        Ok(())
    }
}
