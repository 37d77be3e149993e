use crate::model::{entity::BatchStatistics, vo::ControlEvent};

/// Turns job lifecycle facts into per-batch statistics.
pub trait BatchStatisticsService: Send + Sync {
    /// Apply one event; events that cannot be attributed to a batch are ignored.
    fn apply(&self, event: &ControlEvent);

    /// A copy of the current statistics, `None` for an unknown batch.
    fn get_statistics(&self, batch_no: &str) -> Option<BatchStatistics>;

    /// Forget a batch, returning its last statistics.
    fn evict(&self, batch_no: &str) -> Option<BatchStatistics>;

    fn batches(&self) -> Vec<String>;
}
