mod batch_statistics;
mod control_state;
mod event_bus;

#[rustfmt::skip]
pub use {
    batch_statistics::BatchStatisticsService,
    control_state::ControlStateService,
    event_bus::{handler_fn, EventBus, EventHandler, FnHandler, SubscriptionId},
};
