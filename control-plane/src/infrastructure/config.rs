use domain_control::exception::{ControlException, ControlResult};
use serde::Deserialize;
use service_control::DEFAULT_SOURCE;

use super::telemetry::TelemetryConfig;

pub const DEFAULT_CONFIG_PATH: &str = "control-plane.yaml";
pub const ENV_PREFIX: &str = "CONTROL_PLANE";

#[derive(Clone, Deserialize, Debug)]
pub struct ControlPlaneConfig {
    /// Source tag of the events the control plane issues.
    #[serde(default = "default_source")]
    pub source: String,
    /// Expand group commands into member job requests.
    #[serde(default = "default_enabled")]
    pub cascade_group_commands: bool,
    /// Log every control event to the `audit` target.
    #[serde(default = "default_enabled")]
    pub audit_events: bool,
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            cascade_group_commands: default_enabled(),
            audit_events: default_enabled(),
            command_queue_capacity: default_command_queue_capacity(),
            telemetry: Default::default(),
        }
    }
}

impl ControlPlaneConfig {
    pub fn validate(&self) -> ControlResult<()> {
        if self.source.trim().is_empty() {
            return Err(ControlException::invalid_argument(
                "source",
                &self.source,
                "must not be empty",
            ));
        }
        if self.command_queue_capacity == 0 {
            return Err(ControlException::invalid_argument(
                "command_queue_capacity",
                "0",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize::<Self>()?;
        config.validate()?;
        Ok(config)
    }
}

/// Load the optional YAML file at `path`, then `CONTROL_PLANE__*` environment
/// variables on top of it.
pub fn build_config(path: &str) -> anyhow::Result<ControlPlaneConfig> {
    let config = config::Config::builder()
        .add_source(
            config::File::from(std::path::Path::new(path))
                .format(config::FileFormat::Yaml)
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<ControlPlaneConfig>()?;
    config.validate()?;
    Ok(config)
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_command_queue_capacity() -> usize {
    1024
}
