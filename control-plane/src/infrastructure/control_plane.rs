use std::{future::Future, sync::Arc};

use domain_control::{
    exception::ControlResult,
    model::{
        entity::BatchStatistics,
        vo::{key, ControlEvent, JobEvent},
    },
    service::{BatchStatisticsService, ControlStateService, EventBus},
};
use infrastructure_command::{ControlCommand, ControlTarget};
use serde::Serialize;
use service_control::{
    AuditLogHandler, BatchStatisticsServiceImpl, ControlStateRegistryImpl, EventBusImpl,
    GroupCascadeHandler,
};

use super::config::ControlPlaneConfig;

/// Application root owning the engine: one bus, one registry and one aggregator.
pub struct ControlPlane {
    config: ControlPlaneConfig,
    event_bus: Arc<EventBusImpl>,
    registry: Arc<ControlStateRegistryImpl>,
    statistics: Arc<BatchStatisticsServiceImpl>,
    command_sender: flume::Sender<ControlCommand>,
    command_receiver: flume::Receiver<ControlCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CommandOutcome {
    Accepted,
    Statistics {
        batch_no: String,
        statistics: Option<BatchStatistics>,
    },
}

impl ControlPlane {
    pub fn build(config: ControlPlaneConfig) -> ControlResult<Self> {
        config.validate()?;
        let event_bus = Arc::new(EventBusImpl::new());
        let registry = Arc::new(
            ControlStateRegistryImpl::builder()
                .event_bus(event_bus.clone() as Arc<dyn EventBus>)
                .source(config.source.as_str())
                .build(),
        );
        registry.subscribe_to();

        let statistics = Arc::new(BatchStatisticsServiceImpl::new());
        statistics.subscribe_to(event_bus.as_ref());

        if config.cascade_group_commands {
            let registry: Arc<dyn ControlStateService> = registry.clone();
            Arc::new(GroupCascadeHandler::new(&registry)).subscribe_to(event_bus.as_ref());
        }
        if config.audit_events {
            AuditLogHandler::subscribe_to(event_bus.as_ref());
        }

        let (command_sender, command_receiver) = flume::bounded(config.command_queue_capacity);
        tracing::info!(
            source = %config.source,
            subscribers = event_bus.subscriber_count(),
            "Control plane built"
        );
        Ok(Self {
            config,
            event_bus,
            registry,
            statistics,
            command_sender,
            command_receiver,
        })
    }

    pub fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBusImpl> {
        self.event_bus.clone()
    }

    pub fn registry(&self) -> Arc<dyn ControlStateService> {
        self.registry.clone()
    }

    pub fn statistics(&self) -> Arc<dyn BatchStatisticsService> {
        self.statistics.clone()
    }

    pub fn execute(&self, command: ControlCommand) -> ControlResult<CommandOutcome> {
        tracing::debug!(action = command.action(), "Executing command");
        let registry = self.registry.as_ref();
        match command {
            ControlCommand::Pause { target } => match target {
                ControlTarget::Job(job_code) => registry.request_pause(&job_code)?,
                ControlTarget::Group(group_name) => registry.request_group_pause(&group_name)?,
            },
            ControlCommand::Resume { target } => match target {
                ControlTarget::Job(job_code) => registry.request_resume(&job_code)?,
                ControlTarget::Group(group_name) => registry.request_group_resume(&group_name)?,
            },
            ControlCommand::Stop { target, reason } => match target {
                ControlTarget::Job(job_code) => registry.request_stop(&job_code, &reason)?,
                ControlTarget::Group(group_name) => {
                    registry.request_group_stop(&group_name, &reason)?
                }
            },
            ControlCommand::Cancel { target, strategy } => match target {
                ControlTarget::Job(job_code) => registry.request_cancel(&job_code, &strategy)?,
                ControlTarget::Group(group_name) => {
                    registry.request_group_cancel(&group_name, &strategy)?
                }
            },
            ControlCommand::Start { job_code, batch_no } => {
                registry.request_start(&job_code, &batch_no)?
            }
            ControlCommand::Clear { target } => match target {
                ControlTarget::Job(job_code) => registry.clear(&job_code),
                ControlTarget::Group(group_name) => registry.clear_group(&group_name),
            },
            ControlCommand::CompleteGroupCancel { group_name } => {
                registry.complete_group_cancel(&group_name)?
            }
            ControlCommand::Register {
                job_code,
                batch_no,
                group_name,
                source,
            } => {
                let execution_key = key::make_job_key(&job_code, &batch_no)?;
                tracing::info!(%execution_key, ?group_name, "Job execution registered");
                self.event_bus.publish(ControlEvent::new(
                    source.unwrap_or_else(|| self.config.source.clone()),
                    JobEvent::ExecutionRegistered {
                        job_code,
                        batch_no,
                        group_name,
                    },
                ));
            }
            ControlCommand::Complete {
                job_code,
                batch_no,
                status,
                source,
            } => {
                let execution_key = key::make_job_key(&job_code, &batch_no)?;
                tracing::info!(%execution_key, %status, "Job execution completed");
                self.event_bus.publish(ControlEvent::new(
                    source.unwrap_or_else(|| self.config.source.clone()),
                    JobEvent::ExecutionCompleted {
                        job_code: job_code.clone(),
                        batch_no,
                        status,
                    },
                ));
                registry.clear(&job_code);
            }
            ControlCommand::Statistics { batch_no } => {
                let statistics = self.statistics.get_statistics(&batch_no);
                return Ok(CommandOutcome::Statistics {
                    batch_no,
                    statistics,
                });
            }
        }
        Ok(CommandOutcome::Accepted)
    }

    /// Sending half of the bounded command queue.
    pub fn command_sender(&self) -> flume::Sender<ControlCommand> {
        self.command_sender.clone()
    }

    /// Execute queued commands until `shutdown` resolves, then drain what is left.
    ///
    /// Pending commands are always preferred over shutdown. A failing command is
    /// logged and the loop goes on.
    pub async fn run_command_consumer(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                command = self.command_receiver.recv_async() => match command {
                    Ok(command) => self.consume(command),
                    Err(e) => {
                        tracing::error!("Control command queue closed: {e}");
                        return;
                    }
                },
                _ = &mut shutdown => break,
            }
        }
        for command in self.command_receiver.drain() {
            self.consume(command);
        }
        tracing::info!("Command consumer stopped");
    }

    fn consume(&self, command: ControlCommand) {
        let action = command.action();
        match self.execute(command) {
            Ok(CommandOutcome::Accepted) => {}
            Ok(outcome) => match serde_json::to_string(&outcome) {
                Ok(json) => tracing::info!(action, "{json}"),
                Err(e) => tracing::error!(action, "Unable to render outcome: {e}"),
            },
            Err(e) => tracing::error!(action, "Control command failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use domain_control::{exception::ControlException, model::vo::TerminalStatus};

    use super::*;

    fn plane() -> ControlPlane {
        ControlPlane::build(ControlPlaneConfig {
            audit_events: false,
            ..Default::default()
        })
        .unwrap()
    }

    fn job(job_code: &str) -> ControlTarget {
        ControlTarget::Job(job_code.to_owned())
    }

    fn register(job_code: &str, batch_no: &str, group_name: Option<&str>) -> ControlCommand {
        ControlCommand::Register {
            job_code: job_code.to_owned(),
            batch_no: batch_no.to_owned(),
            group_name: group_name.map(str::to_owned),
            source: None,
        }
    }

    fn complete(job_code: &str, batch_no: &str, source: Option<&str>) -> ControlCommand {
        ControlCommand::Complete {
            job_code: job_code.to_owned(),
            batch_no: batch_no.to_owned(),
            status: TerminalStatus::Success,
            source: source.map(str::to_owned),
        }
    }

    fn statistics(plane: &ControlPlane, batch_no: &str) -> BatchStatistics {
        plane.statistics().get_statistics(batch_no).unwrap()
    }

    #[test]
    fn rejects_an_invalid_config() {
        let result = ControlPlane::build(ControlPlaneConfig {
            command_queue_capacity: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(ControlException::InvalidArgument { .. })));
    }

    #[test]
    fn job_commands_reach_the_registry() {
        let plane = plane();
        plane.execute(ControlCommand::Pause { target: job("J1") }).unwrap();
        assert!(plane.registry().is_pause_requested("J1"));
        plane.execute(ControlCommand::Clear { target: job("J1") }).unwrap();
        assert!(!plane.registry().is_pause_requested("J1"));

        let error = plane
            .execute(ControlCommand::Cancel {
                target: job(""),
                strategy: "rollback".to_owned(),
            })
            .unwrap_err();
        assert!(matches!(error, ControlException::InvalidArgument { .. }));
    }

    #[test]
    fn lifecycle_facts_feed_statistics() {
        let plane = plane();
        plane.execute(register("J1", "B1", None)).unwrap();
        plane.execute(register("J2", "B1", None)).unwrap();
        plane.execute(ControlCommand::Pause { target: job("J2") }).unwrap();
        plane.execute(complete("J1", "B1", None)).unwrap();

        let outcome = plane
            .execute(ControlCommand::Statistics {
                batch_no: "B1".to_owned(),
            })
            .unwrap();
        let CommandOutcome::Statistics {
            statistics: Some(statistics),
            ..
        } = outcome
        else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(statistics.total_jobs, 2);
        assert_eq!(statistics.completed_jobs, 1);
        assert_eq!(statistics.paused_jobs, 1);
        assert_eq!(statistics.data_source.as_deref(), Some("control-service"));
    }

    #[test]
    fn keys_with_separator_are_refused() {
        let plane = plane();
        assert!(plane.execute(register("J#1", "B1", None)).is_err());
        assert!(plane.statistics().batches().is_empty());
    }

    #[test]
    fn group_commands_cascade_to_members() {
        let plane = plane();
        plane.execute(register("J1", "B1", Some("G1"))).unwrap();
        plane.execute(register("J2", "B1", Some("G1"))).unwrap();
        plane
            .execute(ControlCommand::Stop {
                target: ControlTarget::Group("G1".to_owned()),
                reason: "quota".to_owned(),
            })
            .unwrap();
        assert!(plane.registry().is_stop_requested("J1"));
        assert!(plane.registry().is_stop_requested("J2"));

        plane
            .execute(ControlCommand::CompleteGroupCancel {
                group_name: "G1".to_owned(),
            })
            .unwrap();
        assert!(!plane.registry().is_stop_requested("J1"));
        assert!(plane.registry().group_state("G1").is_none());
    }

    #[test]
    fn cascade_can_be_disabled() {
        let plane = ControlPlane::build(ControlPlaneConfig {
            cascade_group_commands: false,
            ..Default::default()
        })
        .unwrap();
        plane.execute(register("J1", "B1", Some("G1"))).unwrap();
        plane
            .execute(ControlCommand::Pause {
                target: ControlTarget::Group("G1".to_owned()),
            })
            .unwrap();
        assert!(!plane.registry().is_pause_requested("J1"));
        assert!(plane.registry().group_state("G1").unwrap().pause_requested);
    }

    #[tokio::test]
    async fn consumer_drains_the_queue_before_stopping() {
        let plane = plane();
        let sender = plane.command_sender();
        let producer = async move {
            for job_code in ["J1", "J2", "J3"] {
                sender
                    .send_async(ControlCommand::Pause {
                        target: job(job_code),
                    })
                    .await
                    .unwrap();
            }
            sender
                .send_async(ControlCommand::Pause { target: job("") })
                .await
                .unwrap();
        };
        plane.run_command_consumer(producer).await;

        for job_code in ["J1", "J2", "J3"] {
            assert!(plane.registry().is_pause_requested(job_code));
        }
        assert!(plane.command_sender().is_empty());
    }

    #[test]
    fn runtime_facts_keep_their_reporter() {
        let plane = plane();
        plane
            .execute(ControlCommand::Register {
                job_code: "J1".to_owned(),
                batch_no: "B1".to_owned(),
                group_name: None,
                source: Some("worker-1".to_owned()),
            })
            .unwrap();
        assert_eq!(statistics(&plane, "B1").data_source.as_deref(), Some("worker-1"));

        plane.execute(complete("J1", "B1", Some("worker-2"))).unwrap();
        assert_eq!(statistics(&plane, "B1").data_source.as_deref(), Some("worker-2"));
    }

    #[test]
    fn group_stop_after_completion_spares_the_next_run() {
        let plane = plane();
        plane.execute(register("J1", "B1", Some("G1"))).unwrap();
        plane.execute(register("J2", "B1", Some("G1"))).unwrap();
        plane.execute(complete("J1", "B1", None)).unwrap();
        plane
            .execute(ControlCommand::Stop {
                target: ControlTarget::Group("G1".to_owned()),
                reason: "quota".to_owned(),
            })
            .unwrap();
        assert!(plane.registry().job_state("J1").is_none());
        assert!(plane.registry().is_stop_requested("J2"));

        plane.execute(register("J1", "B2", None)).unwrap();
        assert!(!plane.registry().is_stop_requested("J1"));
        assert_eq!(plane.registry().group_members("G1"), vec!["J2"]);
    }

    #[tokio::test]
    async fn queued_commands_run_even_when_shutdown_is_immediate() {
        let plane = plane();
        let sender = plane.command_sender();
        for job_code in ["J1", "J2"] {
            sender
                .send_async(ControlCommand::Pause {
                    target: job(job_code),
                })
                .await
                .unwrap();
        }
        plane.run_command_consumer(std::future::ready(())).await;

        assert!(plane.registry().is_pause_requested("J1"));
        assert!(plane.registry().is_pause_requested("J2"));
        assert!(sender.is_empty());
    }
}
