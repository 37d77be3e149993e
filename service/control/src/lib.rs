mod audit;
mod batch_statistics;
mod control_state;
mod event_bus;
mod group_cascade;

#[rustfmt::skip]
pub use {
    audit::AuditLogHandler,
    batch_statistics::BatchStatisticsServiceImpl,
    control_state::{ControlStateRegistryImpl, DEFAULT_SOURCE},
    event_bus::EventBusImpl,
    group_cascade::GroupCascadeHandler,
};
