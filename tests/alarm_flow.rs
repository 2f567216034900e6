// MIT License - Copyright (c) 2021 TJForc
// Alarm commands, status and event log against a scripted service

mod common;

use common::*;
use eone_cloud::{AlarmController, EOneError, LocaleMap, SystemState};
use serde_json::json;

const STATE: &str = "/status/getSystemState";
const COMMAND: &str = "/action/stateCommand";
const DEVICES: &str = "/configuration/v2/getDevicesMultizone";
const HISTORY: &str = "/status/v2/getHistory";
const CMD_OK: &str = r#"{"commandStatus":"CMD_OK"}"#;

fn inventory() -> serde_json::Value {
    json!({
        "centralLearningZone": {
            "sensors": [{"customLabel": "Entrée"}],
            "groupNames": ["Tout", "Maison", "Garage", "Atelier"]
        },
        "centralSettingsZone": {
            "groupesMarchePresence": [true, false, true]
        }
    })
}

fn with_inventory(transport: Scripted) -> Scripted {
    transport
        .on(DEVICES, 200, "{}")
        .on(DEVICES, 200, &job_done(&inventory()))
}

async fn alarm(transport: Scripted) -> AlarmController<Scripted> {
    AlarmController::new(connected(transport).await)
}

#[tokio::test]
async fn test_disarm_when_off_sends_nothing() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on(STATE, 200, r#"{"systemState":"off","groups":[]}"#);
    let mut alarm = alarm(transport).await;

    alarm.disarm_complete().await.unwrap();
    let t = alarm.session().transport();
    assert_eq!(t.count(STATE), 1);
    assert_eq!(t.count(COMMAND), 0);
}

#[tokio::test]
async fn test_disarm_when_armed() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("on", "[]"))
        .on(STATE, 200, r#"{"systemState":"on","groups":[]}"#)
        .on(COMMAND, 200, CMD_OK);
    let mut alarm = alarm(transport).await;

    alarm.disarm_complete().await.unwrap();
    let command = alarm.session().transport().last(COMMAND).unwrap().json();
    assert_eq!(command["systemState"], "off");
    assert_eq!(command["group"], json!([]));
    assert_eq!(alarm.arm_status().unwrap().state, SystemState::Off);
}

#[tokio::test]
async fn test_partial_arming_round_trip() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on(COMMAND, 200, CMD_OK)
        .on(STATE, 200, r#"{"systemState":"group","groups":[1,3]}"#);
    let mut alarm = alarm(transport).await;

    alarm.arm_partial(&[1, 3]).await.unwrap();
    let armed = alarm.arm_status().unwrap();
    assert_eq!(armed.state, SystemState::Group);

    let status = alarm.get_status().await.unwrap();
    assert_eq!(status, armed);
    assert_eq!(status.group_indices(), vec![1, 3]);

    let command = alarm.session().transport().last(COMMAND).unwrap();
    assert_eq!(
        command.body.as_deref(),
        Some(
            r#"{"systemState":"group","group":[1,3],"currentGroup":[],"nbGroups":"4","sessionId":"cloud-session","ttmSessionId":"ttm-session-0001"}"#
        )
    );
}

#[tokio::test]
async fn test_arm_complete() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on(COMMAND, 200, CMD_OK);
    let mut alarm = alarm(transport).await;

    alarm.arm_complete().await.unwrap();
    let command = alarm.session().transport().last(COMMAND).unwrap().json();
    assert_eq!(command["systemState"], "on");
    assert_eq!(alarm.arm_status().unwrap().state, SystemState::On);
}

#[tokio::test]
async fn test_status_reconnects_once_on_expired_session() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on(STATE, 200, r#"{"message":"transmitter.error.invalidsessionid"}"#)
        .on(STATE, 200, r#"{"systemState":"on","groups":[]}"#);
    let mut alarm = alarm(transport).await;

    let status = alarm.get_status().await.unwrap();
    assert_eq!(status.state, SystemState::On);
    let t = alarm.session().transport();
    assert_eq!(t.count("/authenticate/connect"), 2);
    assert_eq!(t.count(STATE), 2);
}

#[tokio::test]
async fn test_status_gives_up_after_one_reconnect() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on(STATE, 200, r#"{"message":"transmitter.error.invalidsessionid"}"#);
    let mut alarm = alarm(transport).await;

    let err = alarm.get_status().await.unwrap_err();
    assert_eq!(err.server_message(), Some("transmitter.error.invalidsessionid"));
    let t = alarm.session().transport();
    assert_eq!(t.count("/authenticate/connect"), 2);
    assert_eq!(t.count(STATE), 2);
}

#[tokio::test]
async fn test_other_status_failures_are_not_retried() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on(STATE, 200, r#"{"message":"something.else"}"#);
    let mut alarm = alarm(transport).await;

    let err = alarm.get_status().await.unwrap_err();
    assert!(matches!(err, EOneError::Protocol { status: 200, .. }));
    let t = alarm.session().transport();
    assert_eq!(t.count("/authenticate/connect"), 1);
    assert_eq!(t.count(STATE), 1);
}

#[tokio::test]
async fn test_refused_command_keeps_last_status() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on(COMMAND, 200, r#"{"commandStatus":"CMD_KO"}"#);
    let mut alarm = alarm(transport).await;

    let err = alarm.arm_complete().await.unwrap_err();
    assert!(matches!(err, EOneError::Protocol { .. }));
    assert_eq!(alarm.arm_status().unwrap().state, SystemState::Off);
}

#[tokio::test]
async fn test_arm_presence_uses_inventory() {
    let transport = with_inventory(
        account(1)
            .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
            .on(COMMAND, 200, CMD_OK),
    );
    let mut alarm = alarm(transport).await;

    let groups = alarm.arm_presence().await.unwrap();
    assert_eq!(groups, vec![1, 3]);

    let t = alarm.session().transport();
    assert_eq!(t.last(COMMAND).unwrap().json()["group"], json!([1, 3]));
    let submit = t
        .requests()
        .into_iter()
        .find(|r| r.path.starts_with(DEVICES))
        .unwrap()
        .json();
    assert_eq!(submit["systemId"], "42");
    assert_eq!(submit["transmitterId"], "TX01");
    assert_eq!(submit["ttmSessionId"], TTM);
}

#[tokio::test]
async fn test_group_names() {
    let transport = with_inventory(
        account(1).on("/authenticate/connect", 200, &connect_ok("group", "[2]")),
    );
    let mut alarm = alarm(transport).await;

    let names = alarm.group_names(&[1, 2]).await.unwrap();
    assert_eq!(names, vec!["Maison", "Garage"]);
    assert!(alarm.catalog().cached().is_some());
}

#[tokio::test]
async fn test_events_are_filtered_and_decoded() {
    let history = json!([
        {"date": "2023-12-31 23:00:00", "codes": [99, 0, 0, 0, 0]},
        {"date": "2024-03-01T10:00:00+01:00", "codes": [34, 2, 1, 0, 1]},
        {"date": "2024-03-02 08:00:00", "codes": [25, 3, 1, 0, 0]},
        {"date": "2024-03-03 09:30:00", "codes": [99, 0, 0, 0, 0]},
        {"date": "2025-01-01 00:00:00", "codes": [34, 2, 1, 0, 1]}
    ]);
    let transport = with_inventory(
        account(1)
            .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
            .on(HISTORY, 200, "{}")
            .on(HISTORY, 200, &job_done(&history)),
    );
    let mut alarm = alarm(transport).await;

    let mut locale = LocaleMap::new();
    locale.insert("logbook.logEvent.34", "Défaut");
    locale.insert("logbook.logMessagesEvent34.appear", "Apparition {0}");
    locale.insert("logbook.logMessagesEvent34.disappear", "Disparition {0}");
    locale.insert("logbook.logEvent.99", "Inconnu");

    let start = Some("2024-01-01 00:00:00");
    let end = Some("2024-12-31 23:59:59");
    let events = alarm.events(&locale, start, end).await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].date, "2024-03-01T10:00:00+01:00");
    assert_eq!(events[0].title, "Défaut");
    assert_eq!(events[0].device, "Entrée");
    assert_eq!(events[0].details, "Apparition Entrée");
    assert_eq!(events[0].origin_code, [34, 2, 1, 0, 1]);
    assert_eq!(events[1].title, "Inconnu");

    // The inventory is fetched once and reused
    alarm.events(&locale, start, end).await.unwrap();
    let t = alarm.session().transport();
    assert_eq!(t.count(DEVICES), 2);
    assert_eq!(t.count(HISTORY), 4);

    let submit = t
        .requests()
        .into_iter()
        .find(|r| r.path.starts_with(HISTORY))
        .unwrap()
        .json();
    assert_eq!(submit["centralId"], "C01");
    assert_eq!(submit["systemId"], "42");
}

#[tokio::test]
async fn test_events_poll_timeout() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on(HISTORY, 200, "{}")
        .on(HISTORY, 200, JOB_PENDING);
    let mut alarm = alarm(transport).await;
    alarm.session_mut().set_events_retry(3).unwrap();

    let err = alarm.raw_events().await.unwrap_err();
    assert!(matches!(err, EOneError::PollTimeout { attempts: 3, .. }));
    assert_eq!(alarm.session().transport().count(HISTORY), 4);
}

#[tokio::test]
async fn test_commands_need_a_connected_session() {
    let mut alarm = AlarmController::new(configured(account(1)).await);
    let before = alarm.session().transport().requests().len();

    assert!(matches!(alarm.arm_complete().await, Err(EOneError::Config(_))));
    assert!(matches!(alarm.get_status().await, Err(EOneError::Config(_))));
    assert!(matches!(alarm.raw_events().await, Err(EOneError::Config(_))));
    assert_eq!(alarm.session().transport().requests().len(), before);
}
