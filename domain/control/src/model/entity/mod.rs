pub mod batch_statistics;
pub mod control_state;

#[rustfmt::skip]
pub use {
    batch_statistics::BatchStatistics,
    control_state::ControlState,
};
