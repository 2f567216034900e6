// MIT License - Copyright (c) 2021 TJForc
// Scripted in-memory transport shared by the protocol tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use eone_cloud::{
    Account, ClientConfig, HttpResponse, Method, Result, SessionManager, Transport,
};

pub const TTM: &str = "ttm-session-0001";
pub const STALE_TTM: &str = "0123456789abcdef0123456789abcdef";

/// One request seen by the transport.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

impl Request {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(self.body.as_deref().unwrap_or("null")).unwrap()
    }
}

/// Replies per path prefix, in order; the last reply of a route repeats.
/// Unknown paths get a 404.
#[derive(Default)]
pub struct Scripted {
    routes: Mutex<Vec<(String, VecDeque<HttpResponse>)>>,
    requests: Mutex<Vec<Request>>,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for every path starting with `prefix`.
    pub fn on(self, prefix: &str, status: u16, body: &str) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            let reply = HttpResponse::new(status, body);
            match routes.iter_mut().find(|(p, _)| p == prefix) {
                Some((_, queue)) => queue.push_back(reply),
                None => routes.push((prefix.to_string(), VecDeque::from([reply]))),
            }
        }
        self
    }

    /// Drop whatever was queued for `prefix` and reply with this instead.
    pub fn replace(self, prefix: &str, status: u16, body: &str) -> Self {
        self.routes.lock().unwrap().retain(|(p, _)| p != prefix);
        self.on(prefix, status, body)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path.starts_with(prefix))
            .count()
    }

    pub fn last(&self, prefix: &str) -> Option<Request> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.path.starts_with(prefix))
    }
}

impl Transport for Scripted {
    async fn send(&self, method: Method, path: &str, body: Option<&str>) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(Request {
            method,
            path: path.to_string(),
            body: body.map(str::to_string),
        });
        let mut routes = self.routes.lock().unwrap();
        let reply = routes
            .iter_mut()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .and_then(|(_, queue)| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            });
        Ok(reply.unwrap_or_else(|| HttpResponse::new(404, "")))
    }
}

/// Login, system list, configuration and reachability replies for an
/// account whose system 0 has the given role.
pub fn account(role: u8) -> Scripted {
    Scripted::new()
        .on("/authenticate/login", 200, r#"{"sessionId":"cloud-session"}"#)
        .on(
            "/configuration/getSystems",
            200,
            &format!(
                r#"{{"diagralId":99,"systems":[
                    {{"id":42,"role":{role},"installationComplete":true,"name":"Maison"}},
                    {{"id":43,"role":1,"installationComplete":false}}
                ]}}"#
            ),
        )
        .on(
            "/configuration/getConfiguration",
            200,
            r#"{"transmitterId":"TX01","centralId":"C01","rights":{"UNIVERSE_ALARMS":true}}"#,
        )
        .on("/installation/isConnected", 200, r#"{"isConnected":true}"#)
}

pub fn connect_ok(state: &str, groups: &str) -> String {
    format!(r#"{{"ttmSessionId":"{TTM}","systemState":"{state}","groups":{groups}}}"#)
}

pub fn session(transport: Scripted) -> SessionManager<Scripted> {
    SessionManager::new(transport, ClientConfig::default(), Account::new("me@example.com", "pw"))
        .unwrap()
}

/// Drive a session up to the configured state, system 0 selected.
pub async fn configured(transport: Scripted) -> SessionManager<Scripted> {
    let mut session = session(transport);
    session.login().await.unwrap();
    session.list_systems().await.unwrap();
    session.select_system(0).unwrap();
    session.fetch_configuration().await.unwrap();
    session
}

/// Drive a session all the way to an open transmitter session.
pub async fn connected(transport: Scripted) -> SessionManager<Scripted> {
    let mut session = configured(transport).await;
    session.connect("1234").await.unwrap();
    session
}

/// A finished job envelope carrying `payload` as a JSON string.
pub fn job_done(payload: &serde_json::Value) -> String {
    serde_json::json!({
        "status": "request_status_done",
        "response": payload.to_string(),
    })
    .to_string()
}

pub const JOB_PENDING: &str = r#"{"status":"request_status_pending"}"#;
