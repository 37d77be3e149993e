use control_plane::infrastructure::{CommandOutcome, ControlPlane, ControlPlaneConfig};
use indoc::indoc;
use infrastructure_command::ControlCommand;

const COMMANDS: &str = indoc! {r#"
    {"action": "register", "jobCode": "J1", "batchNo": "B7", "groupName": "nightly"}
    {"action": "register", "jobCode": "J2", "batchNo": "B7", "groupName": "nightly"}
    {"action": "pause", "target": {"group": "nightly"}}
    {"action": "resume", "target": {"job": "J1"}}
    {"action": "complete", "jobCode": "J1", "batchNo": "B7", "status": "success"}
"#};

fn plane() -> ControlPlane {
    let config = ControlPlaneConfig::from_yaml(indoc! {"
        source: integration
        audit_events: false
        command_queue_capacity: 2
        telemetry:
          enable: false
    "})
    .unwrap();
    ControlPlane::build(config).unwrap()
}

#[tokio::test]
async fn json_commands_drive_the_engine() {
    let plane = plane();
    let sender = plane.command_sender();
    let producer = async move {
        for line in COMMANDS.lines() {
            let command: ControlCommand = serde_json::from_str(line).unwrap();
            sender.send_async(command).await.unwrap();
        }
    };
    plane.run_command_consumer(producer).await;

    let registry = plane.registry();
    assert!(!registry.is_pause_requested("J1"));
    assert!(registry.is_pause_requested("J2"));
    assert_eq!(registry.group_members("nightly"), vec!["J1", "J2"]);

    let outcome = plane
        .execute(ControlCommand::Statistics {
            batch_no: "B7".to_owned(),
        })
        .unwrap();
    let CommandOutcome::Statistics {
        statistics: Some(statistics),
        ..
    } = outcome
    else {
        panic!("no statistics for B7");
    };
    assert_eq!(statistics.total_jobs, 2);
    assert_eq!(statistics.completed_jobs, 1);
    assert_eq!(statistics.paused_jobs, 1);
    assert_eq!(statistics.running_jobs, 0);
    assert_eq!(statistics.data_source.as_deref(), Some("integration"));
    assert!(statistics.is_consistent());
}

#[test]
fn unknown_batch_is_not_an_error() {
    let outcome = plane()
        .execute(ControlCommand::Statistics {
            batch_no: "B404".to_owned(),
        })
        .unwrap();
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        serde_json::json!({"outcome": "statistics", "batchNo": "B404", "statistics": null})
    );
}
