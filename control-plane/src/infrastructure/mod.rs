pub mod config;
mod control_plane;
pub mod telemetry;

#[rustfmt::skip]
pub use {
    config::{build_config, ControlPlaneConfig},
    control_plane::{CommandOutcome, ControlPlane},
};
