//! Domain model of the batch/job control-state engine.

pub mod exception;
#[cfg(feature = "mock")]
pub mod mock;
pub mod model;
pub mod service;
