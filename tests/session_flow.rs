// MIT License - Copyright (c) 2021 TJForc
// Session lifecycle against a scripted service

mod common;

use common::*;
use eone_cloud::{EOneError, Method, SessionState, SystemState};

#[tokio::test]
async fn test_login_to_connected() {
    let transport = account(1).on(
        "/authenticate/connect",
        200,
        &connect_ok("group", "[1,3]"),
    );
    let session = connected(transport).await;

    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(session.ttm_session_id(), Some(TTM));
    let status = session.arm_status().unwrap();
    assert_eq!(status.state, SystemState::Group);
    assert_eq!(status.group_indices(), vec![1, 3]);

    let installation = session.installation().unwrap();
    assert_eq!(installation.transmitter_id, "TX01");
    assert_eq!(installation.central_id, "C01");

    let t = session.transport();
    assert_eq!(
        t.paths(),
        vec![
            "/authenticate/login",
            "/configuration/getSystems",
            "/configuration/getConfiguration",
            "/installation/isConnected",
            "/authenticate/connect",
        ]
    );
    assert!(t.requests().iter().all(|r| r.method == Method::Post));

    let connect = t.last("/authenticate/connect").unwrap();
    assert_eq!(
        connect.body.as_deref(),
        Some(r#"{"masterCode":"1234","transmitterId":"TX01","systemId":42,"role":1,"sessionId":"cloud-session"}"#)
    );
    let conf = t.last("/configuration/getConfiguration").unwrap().json();
    assert_eq!(conf["systemId"], 42);
    assert_eq!(conf["role"], 1);
}

#[tokio::test]
async fn test_non_numeric_master_code_makes_no_request() {
    let mut session = configured(account(1)).await;
    let before = session.transport().requests().len();

    let err = session.connect("12a4").await.unwrap_err();
    assert!(matches!(err, EOneError::Config(_)));
    assert!(err.is_fatal());
    assert_eq!(session.transport().requests().len(), before);
    assert_eq!(session.state(), SessionState::Configured);
}

#[tokio::test]
async fn test_master_reclaims_open_session_once() {
    let transport = account(1)
        .on(
            "/authenticate/connect",
            200,
            r#"{"message":"transmitter.connection.sessionalreadyopen","details":"busy"}"#,
        )
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on("/authenticate/getLastTtmSessionId", 200, STALE_TTM)
        .on("/authenticate/disconnect", 200, r#"{"status":"OK"}"#);
    let session = connected(transport).await;

    assert_eq!(session.state(), SessionState::Connected);
    let t = session.transport();
    let paths = t.paths();
    assert_eq!(
        &paths[3..],
        &[
            "/installation/isConnected",
            "/authenticate/connect",
            "/authenticate/getLastTtmSessionId",
            "/authenticate/disconnect",
            "/authenticate/connect",
        ]
    );
    let disconnect = t.last("/authenticate/disconnect").unwrap().json();
    assert_eq!(disconnect["ttmSessionId"], STALE_TTM);
    assert_eq!(disconnect["systemId"], "42");
}

#[tokio::test]
async fn test_master_retries_without_recoverable_session() {
    let transport = account(1)
        .on(
            "/authenticate/connect",
            200,
            r#"{"message":"transmitter.connection.sessionalreadyopen"}"#,
        )
        .on("/authenticate/connect", 200, &connect_ok("on", "[]"))
        .on("/authenticate/getLastTtmSessionId", 200, r#"{"message":"none"}"#);
    let session = connected(transport).await;

    let t = session.transport();
    assert_eq!(t.count("/authenticate/connect"), 2);
    assert_eq!(t.count("/authenticate/disconnect"), 0);
}

#[tokio::test]
async fn test_standard_user_conflict_is_immediate() {
    let transport = account(0).on(
        "/authenticate/connect",
        200,
        r#"{"message":"transmitter.connection.sessionalreadyopen","details":"Used by Alice"}"#,
    );
    let mut session = configured(transport).await;

    let err = session.connect("1234").await.unwrap_err();
    assert!(matches!(err, EOneError::SessionConflict { status: 200, .. }));
    assert_eq!(
        err.server_message(),
        Some("transmitter.connection.sessionalreadyopen")
    );
    let t = session.transport();
    assert_eq!(t.count("/authenticate/connect"), 1);
    assert_eq!(t.count("/authenticate/getLastTtmSessionId"), 0);
    assert_eq!(t.count("/authenticate/disconnect"), 0);
}

#[tokio::test]
async fn test_conflict_retries_are_bounded() {
    let transport = account(1)
        .on(
            "/authenticate/connect",
            200,
            r#"{"message":"transmitter.connection.sessionalreadyopen"}"#,
        )
        .on("/authenticate/getLastTtmSessionId", 200, STALE_TTM)
        .on("/authenticate/disconnect", 200, r#"{"status":"OK"}"#);
    let mut session = configured(transport).await;

    let err = session.connect("1234").await.unwrap_err();
    assert!(matches!(err, EOneError::SessionConflict { .. }));
    assert!(err.is_fatal());
    let t = session.transport();
    assert_eq!(t.count("/authenticate/connect"), 3);
    assert_eq!(t.count("/authenticate/disconnect"), 3);
}

#[tokio::test]
async fn test_bad_pin_is_auth_error() {
    let transport = account(1).on(
        "/authenticate/connect",
        200,
        r#"{"message":"transmitter.connection.badpincode"}"#,
    );
    let mut session = configured(transport).await;

    let err = session.connect("0000").await.unwrap_err();
    assert!(matches!(err, EOneError::Auth { .. }));
    assert_eq!(session.state(), SessionState::Configured);
}

#[tokio::test]
async fn test_unknown_account() {
    let transport = Scripted::new().on(
        "/authenticate/login",
        404,
        r#"{"message":"error.connect.mydiagralusernotfound"}"#,
    );
    let mut session = session(transport);

    let err = session.login().await.unwrap_err();
    assert!(matches!(err, EOneError::Auth { status: 404, .. }));
    assert!(err.to_string().contains("not found"));
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_unreachable_service_is_fatal() {
    let transport = Scripted::new().on("/authenticate/login", 0, "");
    let mut session = session(transport);

    let err = session.login().await.unwrap_err();
    assert!(matches!(err, EOneError::Transport { status: 0, .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_missing_diagral_id_is_protocol_error() {
    let transport = Scripted::new()
        .on("/authenticate/login", 200, r#"{"sessionId":"s"}"#)
        .on("/configuration/getSystems", 200, r#"{"systems":[]}"#);
    let mut session = session(transport);
    session.login().await.unwrap();

    let err = session.list_systems().await.unwrap_err();
    assert!(matches!(err, EOneError::Protocol { status: 200, .. }));
}

#[tokio::test]
async fn test_system_selection_rules() {
    let mut session = session(account(1));
    session.login().await.unwrap();

    // Listing must come first
    assert!(matches!(session.select_system(0), Err(EOneError::Config(_))));
    session.list_systems().await.unwrap();

    assert!(matches!(session.select_system(1), Err(EOneError::Config(_))));
    assert!(matches!(session.select_system(7), Err(EOneError::Config(_))));
    assert_eq!(session.state(), SessionState::Authenticated);

    session.select_system(0).unwrap();
    assert_eq!(session.state(), SessionState::SystemSelected);
    assert_eq!(session.selected_system().unwrap().id, 42);
}

#[tokio::test]
async fn test_standard_user_needs_alarm_right() {
    let transport = account(0).replace(
        "/configuration/getConfiguration",
        200,
        r#"{"transmitterId":"TX01","centralId":"C01","rights":{"UNIVERSE_ALARMS":false}}"#,
    );
    let mut session = session(transport);
    session.login().await.unwrap();
    session.list_systems().await.unwrap();
    session.select_system(0).unwrap();

    let err = session.fetch_configuration().await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(session.state(), SessionState::SystemSelected);
}

#[tokio::test]
async fn test_transmitter_offline() {
    let transport = account(1).replace("/installation/isConnected", 200, r#"{"isConnected":false}"#);
    let mut session = configured(transport).await;

    assert!(matches!(
        session.verify_reachable().await,
        Err(EOneError::TransmitterUnreachable { status: 200 })
    ));
    let err = session.connect("1234").await.unwrap_err();
    assert!(matches!(err, EOneError::TransmitterUnreachable { .. }));
    assert_eq!(session.transport().count("/authenticate/connect"), 0);
}

#[tokio::test]
async fn test_logout_disconnects_first() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on("/authenticate/disconnect", 200, r#"{"status":"OK"}"#)
        .on("/authenticate/logout", 200, r#"{"status":"OK"}"#);
    let mut session = connected(transport).await;

    session.logout().await.unwrap();
    assert_eq!(session.state(), SessionState::LoggedOut);
    assert!(session.session_id().is_none());
    assert!(session.ttm_session_id().is_none());

    let t = session.transport();
    let paths = t.paths();
    assert_eq!(
        &paths[paths.len() - 2..],
        &["/authenticate/disconnect", "/authenticate/logout"]
    );
    assert_eq!(
        t.last("/authenticate/logout").unwrap().body.as_deref(),
        Some(r#"{"systemId":"null","sessionId":"cloud-session"}"#)
    );
    assert_eq!(t.last("/authenticate/disconnect").unwrap().json()["ttmSessionId"], TTM);
}

#[tokio::test]
async fn test_disconnect_then_reconnect() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on("/authenticate/disconnect", 200, r#"{"status":"OK"}"#);
    let mut session = connected(transport).await;

    session.disconnect(None).await.unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(session.connected_ids().is_err());

    session.connect("1234").await.unwrap();
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_refused_disconnect_is_reported() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &connect_ok("off", "[]"))
        .on("/authenticate/disconnect", 500, "");
    let mut session = connected(transport).await;

    let err = session.disconnect(None).await.unwrap_err();
    assert!(matches!(err, EOneError::Transport { status: 500, .. }));
    assert!(err.is_retryable());
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_connect_without_reported_state() {
    let transport = account(1)
        .on("/authenticate/connect", 200, &format!(r#"{{"ttmSessionId":"{TTM}"}}"#))
        .on("/authenticate/disconnect", 200, r#"{"status":"OK"}"#);
    let mut session = connected(transport).await;

    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(session.ttm_session_id(), Some(TTM));
    assert!(session.arm_status().is_none());

    // The session is tracked, so it can be closed again
    session.disconnect(None).await.unwrap();
    assert_eq!(session.transport().last("/authenticate/disconnect").unwrap().json()["ttmSessionId"], TTM);
}

#[tokio::test]
async fn test_relisting_systems_requires_new_selection() {
    let mut session = configured(account(1)).await;

    session.list_systems().await.unwrap();
    assert_eq!(session.state(), SessionState::Authenticated);
    assert!(session.selected_system().is_none());
    assert!(session.installation().is_none());

    let before = session.transport().requests().len();
    let err = session.connect("1234").await.unwrap_err();
    assert!(matches!(err, EOneError::Config(_)));
    assert_eq!(session.transport().requests().len(), before);
}

#[tokio::test]
async fn test_unreachable_during_session_reclaim_is_fatal() {
    let transport = account(1)
        .on(
            "/authenticate/connect",
            200,
            r#"{"message":"transmitter.connection.sessionalreadyopen"}"#,
        )
        .on("/authenticate/getLastTtmSessionId", 200, STALE_TTM)
        .on("/authenticate/disconnect", 0, "");
    let mut session = configured(transport).await;

    let err = session.connect("1234").await.unwrap_err();
    assert!(matches!(err, EOneError::Transport { status: 0, .. }));
    assert!(err.is_fatal());
    let t = session.transport();
    assert_eq!(t.count("/authenticate/connect"), 1);
    assert_eq!(t.count("/authenticate/disconnect"), 1);
    assert_eq!(session.state(), SessionState::Configured);
}
