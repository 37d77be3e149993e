use std::{
    sync::{Arc, Mutex},
    thread,
};

use domain_control::{
    model::vo::{
        key, Checkpoint, ControlEvent, EventFamily, EventKind, GroupEvent, JobEvent, TerminalStatus,
    },
    service::{handler_fn, BatchStatisticsService, ControlStateService, EventBus},
};
use service_control::{
    AuditLogHandler, BatchStatisticsServiceImpl, ControlStateRegistryImpl, EventBusImpl,
    GroupCascadeHandler,
};

struct Engine {
    bus: Arc<EventBusImpl>,
    registry: Arc<ControlStateRegistryImpl>,
    statistics: Arc<BatchStatisticsServiceImpl>,
}

fn engine() -> Engine {
    let bus = Arc::new(EventBusImpl::new());
    let registry = Arc::new(
        ControlStateRegistryImpl::builder()
            .event_bus(bus.clone() as Arc<dyn EventBus>)
            .build(),
    );
    registry.subscribe_to();
    let statistics = Arc::new(BatchStatisticsServiceImpl::new());
    statistics.subscribe_to(bus.as_ref());
    let cascade_registry: Arc<dyn ControlStateService> = registry.clone();
    Arc::new(GroupCascadeHandler::new(&cascade_registry)).subscribe_to(bus.as_ref());
    AuditLogHandler::subscribe_to(bus.as_ref());
    Engine {
        bus,
        registry,
        statistics,
    }
}

fn registered(job_code: &str, batch_no: &str, group_name: Option<&str>) -> ControlEvent {
    ControlEvent::new(
        "execution-runtime",
        JobEvent::ExecutionRegistered {
            job_code: job_code.to_owned(),
            batch_no: batch_no.to_owned(),
            group_name: group_name.map(str::to_owned),
        },
    )
}

fn completed(job_code: &str, batch_no: &str, status: TerminalStatus) -> ControlEvent {
    ControlEvent::new(
        "execution-runtime",
        JobEvent::ExecutionCompleted {
            job_code: job_code.to_owned(),
            batch_no: batch_no.to_owned(),
            status,
        },
    )
}

#[test]
fn batch_of_three_reports_success_rate() {
    let engine = engine();
    for job_code in ["J1", "J2", "J3"] {
        engine.bus.publish(registered(job_code, "B100", None));
    }
    engine.bus.publish(completed("J1", "B100", TerminalStatus::Success));
    engine.bus.publish(completed("J2", "B100", TerminalStatus::Success));
    let failed = completed("J3", "B100", TerminalStatus::Failed);
    engine.bus.publish(failed.clone());
    engine.bus.publish(failed);

    let stats = engine.statistics.get_statistics("B100").unwrap();
    assert_eq!(stats.total_jobs, 3);
    assert_eq!(stats.completed_jobs, 2);
    assert_eq!(stats.failed_jobs, 1);
    assert_eq!(stats.running_jobs, 0);
    assert!((stats.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert!(stats.is_finished());
    assert_eq!(engine.bus.failed_deliveries(), 0);
}

#[test]
fn pause_is_visible_until_cleared() {
    let engine = engine();
    engine.registry.request_pause("J1").unwrap();
    assert!(engine.registry.is_pause_requested("J1"));
    engine.registry.clear("J1");
    assert!(!engine.registry.is_pause_requested("J1"));
}

#[test]
fn group_cancel_reaches_every_member_of_the_current_batch() {
    let engine = engine();
    let log = Arc::new(Mutex::new(vec![]));
    {
        let log = log.clone();
        engine.bus.subscribe(
            EventKind::JobCancelled.into(),
            handler_fn("recorder", move |event| {
                log.lock().unwrap().push(event.job_code().unwrap_or_default().to_owned());
                Ok(())
            }),
        );
    }
    engine.bus.publish(registered("OLD", "B1", Some("nightly")));
    engine.bus.publish(registered("J1", "B2", Some("nightly")));
    engine.bus.publish(registered("J2", "B2", Some("nightly")));
    engine.bus.publish(registered("X1", "B2", Some("weekly")));

    engine.registry.request_group_cancel("nightly", "rollback").unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["J1", "J2"]);
    assert_eq!(engine.registry.checkpoint("J1"), Checkpoint::Cancel("rollback".to_owned()));
    assert_eq!(engine.registry.checkpoint("OLD"), Checkpoint::Continue);
    assert_eq!(engine.registry.checkpoint("X1"), Checkpoint::Continue);

    engine.bus.publish(completed("J1", "B2", TerminalStatus::Cancelled));
    engine.registry.clear("J1");
    assert_eq!(engine.registry.group_members("nightly"), vec!["J2"]);
    engine.registry.complete_group_cancel("nightly").unwrap();
    assert!(engine.registry.job_state("J2").is_none());
    engine.bus.publish(completed("J2", "B2", TerminalStatus::Cancelled));
    assert!(engine.registry.group_members("nightly").is_empty());
    assert!(engine.registry.job_state("J1").is_none());
    assert!(engine.registry.group_state("nightly").is_none());
    assert_eq!(engine.statistics.get_statistics("B2").unwrap().cancelled_jobs, 2);
}

#[test]
fn subscribers_see_events_of_one_job_in_order() {
    let engine = engine();
    let (_, receiver) = engine.bus.subscribe_channel(EventFamily::Job.into());
    engine.registry.request_pause("J1").unwrap();
    engine.registry.request_resume("J1").unwrap();
    engine.registry.request_stop("J1", "done").unwrap();
    let kinds: Vec<EventKind> = receiver.try_iter().map(|event| event.kind()).collect();
    assert_eq!(
        kinds,
        vec![EventKind::JobPaused, EventKind::JobResumed, EventKind::JobStopped]
    );
}

#[test]
fn concurrent_updates_keep_batches_consistent() {
    const WORKERS: usize = 8;
    const JOBS: usize = 50;
    let engine = Arc::new(engine());

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let engine = engine.clone();
            thread::spawn(move || {
                for job in 0..JOBS {
                    let job_code = format!("W{worker}-J{job}");
                    let batch_no = format!("B{}", job % 2);
                    assert!(key::belongs_to_batch(
                        &key::make_safe_job_key(&job_code, &batch_no),
                        &batch_no
                    ));
                    engine.bus.publish(registered(&job_code, &batch_no, None));
                    if job % 3 == 0 {
                        engine.registry.request_pause(&job_code).unwrap();
                        engine.registry.request_resume(&job_code).unwrap();
                    }
                    let status = if job % 5 == 0 {
                        TerminalStatus::Failed
                    } else {
                        TerminalStatus::Success
                    };
                    let event = completed(&job_code, &batch_no, status);
                    engine.bus.publish(event.clone());
                    engine.bus.publish(event);
                    engine.registry.clear(&job_code);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut total = 0;
    for batch_no in engine.statistics.batches() {
        let stats = engine.statistics.get_statistics(&batch_no).unwrap();
        assert!(stats.is_consistent(), "{stats:?}");
        assert_eq!(stats.running_jobs + stats.paused_jobs, 0);
        assert_eq!(stats.completed_jobs + stats.failed_jobs, stats.total_jobs);
        total += stats.total_jobs;
    }
    assert_eq!(total, (WORKERS * JOBS) as u64);
    let failed: u64 = ["B0", "B1"]
        .iter()
        .map(|batch_no| engine.statistics.get_statistics(batch_no).unwrap().failed_jobs)
        .sum();
    assert_eq!(failed, (WORKERS * (0..JOBS).filter(|job| job % 5 == 0).count()) as u64);
}

#[test]
fn group_events_without_members_are_harmless() {
    let engine = engine();
    engine.bus.publish(ControlEvent::new(
        "control-service",
        GroupEvent::Resumed {
            group_name: "empty".to_owned(),
        },
    ));
    engine.registry.request_group_pause("empty").unwrap();
    assert!(engine.registry.group_state("empty").unwrap().pause_requested);
    assert_eq!(engine.bus.failed_deliveries(), 0);
}

#[test]
fn group_stop_skips_members_that_already_finished() {
    let engine = engine();
    engine.bus.publish(registered("J1", "B1", Some("G1")));
    engine.bus.publish(registered("J2", "B1", Some("G1")));
    engine.bus.publish(completed("J1", "B1", TerminalStatus::Success));
    engine.registry.clear("J1");

    engine.registry.request_group_stop("G1", "quota").unwrap();
    assert!(engine.registry.job_state("J1").is_none());
    assert!(engine.registry.is_stop_requested("J2"));

    engine.bus.publish(registered("J1", "B2", None));
    assert!(!engine.registry.is_stop_requested("J1"));
    assert_eq!(engine.registry.group_members("G1"), vec!["J2"]);
}
