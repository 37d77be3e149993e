use std::sync::Arc;

use mockall::mock;

use crate::{
    exception::ControlResult,
    model::{
        entity::{BatchStatistics, ControlState},
        vo::{Checkpoint, ControlEvent, EventType, QueryType},
    },
    service::{
        BatchStatisticsService, ControlStateService, EventBus, EventHandler, SubscriptionId,
    },
};

mock! {
    pub EventBus {}
    impl EventBus for EventBus {
        fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventHandler>) -> SubscriptionId;
        fn unsubscribe(&self, id: SubscriptionId) -> bool;
        fn publish(&self, event: ControlEvent);
    }
}

mock! {
    pub ControlStateService {}
    impl ControlStateService for ControlStateService {
        fn request_pause(&self, job_code: &str) -> ControlResult<()>;
        fn request_resume(&self, job_code: &str) -> ControlResult<()>;
        fn request_stop(&self, job_code: &str, reason: &str) -> ControlResult<()>;
        fn request_cancel(&self, job_code: &str, strategy: &str) -> ControlResult<()>;
        fn request_start(&self, job_code: &str, batch_no: &str) -> ControlResult<()>;
        fn request_group_pause(&self, group_name: &str) -> ControlResult<()>;
        fn request_group_resume(&self, group_name: &str) -> ControlResult<()>;
        fn request_group_stop(&self, group_name: &str, reason: &str) -> ControlResult<()>;
        fn request_group_cancel(&self, group_name: &str, strategy: &str) -> ControlResult<()>;
        fn complete_group_cancel(&self, group_name: &str) -> ControlResult<()>;
        fn is_pause_requested(&self, job_code: &str) -> bool;
        fn is_stop_requested(&self, job_code: &str) -> bool;
        fn is_cancel_requested(&self, job_code: &str) -> Option<String>;
        fn query_status(&self, job_code: &str, query_type: QueryType) -> bool;
        fn checkpoint(&self, job_code: &str) -> Checkpoint;
        fn job_state(&self, job_code: &str) -> Option<ControlState>;
        fn group_state(&self, group_name: &str) -> Option<ControlState>;
        fn group_members(&self, group_name: &str) -> Vec<String>;
        fn clear(&self, job_code: &str);
        fn clear_group(&self, group_name: &str);
    }
}

mock! {
    pub BatchStatisticsService {}
    impl BatchStatisticsService for BatchStatisticsService {
        fn apply(&self, event: &ControlEvent);
        fn get_statistics(&self, batch_no: &str) -> Option<BatchStatistics>;
        fn evict(&self, batch_no: &str) -> Option<BatchStatistics>;
        fn batches(&self) -> Vec<String>;
    }
}
