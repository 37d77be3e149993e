use colored::Colorize;
use infrastructure_command::ControlCommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::infrastructure::{
    build_config, config::DEFAULT_CONFIG_PATH, telemetry::initialize_telemetry, ControlPlane,
};

pub fn run() {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(x) => x,
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build runtime".red(), e);
        }
    };
    runtime.block_on(async_run());
}

pub async fn async_run() {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match build_config(&path) {
        Ok(x) => x,
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build config".red(), e);
        }
    };
    if let Err(e) = initialize_telemetry(&config.telemetry) {
        return eprintln!("{}: {}", "Cannot build logger".red(), e);
    };
    let plane = match ControlPlane::build(config) {
        Ok(x) => x,
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build control plane".red(), e);
        }
    };

    let sender = plane.command_sender();
    let shutdown = async move {
        tokio::select! {
            _ = read_commands(sender) => {
                info!("Input closed, stopping control plane.");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping control plane (ctrl-c handling).");
            }
        }
    };
    plane.run_command_consumer(shutdown).await;
}

/// Forward JSON command lines from stdin into the command queue until EOF.
async fn read_commands(sender: flume::Sender<ControlCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("Unable to read stdin: {e}");
                return;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match serde_json::from_str::<ControlCommand>(line) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Skipping malformed command {line:?}: {e}");
                continue;
            }
        };
        if let Err(e) = sender.send_async(command).await {
            tracing::error!("Command queue closed: {e}");
            return;
        }
    }
}
