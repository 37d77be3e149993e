pub mod config;
pub use self::config::*;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{Layer, Registry};

/// Install the global subscriber: one global filter, then a console and a file layer
/// each behind its own filter.
pub fn initialize_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    if !config.enable {
        return Ok(());
    }
    let filter = env_filter(&config.max_level, &config.level_filter, &config.level_filter_env);
    let console = {
        let config = &config.console;
        config.enable.then(|| {
            let debug = config.enable_debug_logging;
            tracing_subscriber::fmt::layer()
                .with_file(debug)
                .with_line_number(debug)
                .with_thread_ids(debug)
                .with_target(debug)
                .with_filter(env_filter(
                    &config.max_level,
                    &config.level_filter,
                    &config.level_filter_env,
                ))
        })
    };
    let file = {
        let config = &config.file;
        config.enable.then(|| {
            let debug = config.enable_debug_logging;
            let file_appender = RollingFileAppender::new(
                config.rolling_time.clone().into(),
                &config.path,
                &config.prefix,
            );
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender)
                .with_file(debug)
                .with_line_number(debug)
                .with_thread_ids(debug)
                .with_target(debug)
                .with_filter(env_filter(
                    &config.max_level,
                    &config.level_filter,
                    &config.level_filter_env,
                ))
        })
    };
    Registry::default().with(filter).with(console).with(file).try_init()?;
    Ok(())
}

/// Directives from `env` take precedence over the configured ones when the variable
/// is set.
fn env_filter(level: &LoggingLevel, directives: &str, env: &str) -> EnvFilter {
    let directives = match env {
        "" => directives.to_owned(),
        env => std::env::var(env).unwrap_or_else(|_| directives.to_owned()),
    };
    EnvFilter::builder()
        .with_default_directive(level.clone().into())
        .parse_lossy(directives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_telemetry_installs_nothing() {
        let config = TelemetryConfig {
            enable: false,
            ..Default::default()
        };
        initialize_telemetry(&config).unwrap();
    }

    #[test]
    fn filters_accept_custom_directives() {
        let filter = env_filter(&LoggingLevel::Warn, "service_control=debug", "");
        let rendered = filter.to_string();
        assert!(rendered.contains("service_control=debug"));
        assert!(rendered.contains("warn"));
    }
}
