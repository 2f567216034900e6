// MIT License - Copyright (c) 2021 TJForc
// Request and response bodies of the e-ONE cloud API

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{NB_GROUPS, TTM_SESSION_ID_LEN};
use crate::devices::inventory::truthy;
use crate::devices::SystemState;
use crate::error::{EOneError, Result, ServerMessage};
use crate::transport::HttpResponse;

/// Role of the account on an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    /// Standard user; needs the alarm right and cannot reclaim sessions
    Standard,
    /// Master user
    Master,
}

impl Role {
    pub fn as_u8(&self) -> u8 {
        match self {
            Role::Standard => 0,
            Role::Master => 1,
        }
    }

    pub fn is_master(&self) -> bool {
        *self == Role::Master
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::Standard),
            1 => Ok(Role::Master),
            other => Err(format!("unknown role {other}")),
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> u8 {
        role.as_u8()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Standard => f.write_str("standard"),
            Role::Master => f.write_str("master"),
        }
    }
}

/// One installation reachable with the account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDescriptor {
    pub id: i64,
    pub role: Role,
    #[serde(default)]
    pub installation_complete: bool,
    #[serde(default)]
    pub name: Option<String>,
}

/// Reply of `getSystems`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemsReply {
    pub diagral_id: Value,
    #[serde(default)]
    pub systems: Vec<SystemDescriptor>,
}

/// Identifiers and rights of the selected installation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationConfig {
    #[serde(deserialize_with = "id_string")]
    pub transmitter_id: String,
    #[serde(deserialize_with = "id_string")]
    pub central_id: String,
    #[serde(default)]
    pub rights: HashMap<String, Value>,
}

impl InstallationConfig {
    pub fn has_right(&self, right: &str) -> bool {
        self.rights.get(right).is_some_and(truthy)
    }
}

/// Successful reply of `connect`. The armed state is not always included.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectReply {
    pub ttm_session_id: String,
    #[serde(default)]
    pub system_state: Option<SystemState>,
    #[serde(default)]
    pub groups: Vec<u8>,
}

/// Successful reply of `getSystemState`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStateReply {
    pub system_state: SystemState,
    #[serde(default)]
    pub groups: Vec<u8>,
}

/// Raw event as listed by a finished history job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawEvent {
    pub date: String,
    pub codes: [i64; 5],
}

// Requests. Field order is the order the service has always received.

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest<'a> {
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationRequest<'a> {
    pub system_id: i64,
    pub role: u8,
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IsConnectedRequest<'a> {
    pub transmitter_id: &'a str,
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastTtmSessionRequest<'a> {
    pub system_id: i64,
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest<'a> {
    pub master_code: &'a str,
    pub transmitter_id: &'a str,
    pub system_id: i64,
    pub role: u8,
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStateRequest<'a> {
    pub session_id: &'a str,
    pub central_id: &'a str,
    pub ttm_session_id: &'a str,
}

/// Arm/disarm command. `nbGroups` is always "4", whatever the installation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateCommandRequest<'a> {
    pub system_state: SystemState,
    pub group: &'a [u8],
    pub current_group: [u8; 0],
    pub nb_groups: &'static str,
    pub session_id: &'a str,
    pub ttm_session_id: &'a str,
}

impl<'a> StateCommandRequest<'a> {
    pub fn new(
        system_state: SystemState,
        group: &'a [u8],
        session_id: &'a str,
        ttm_session_id: &'a str,
    ) -> Self {
        Self {
            system_state,
            group,
            current_group: [],
            nb_groups: NB_GROUPS,
            session_id,
            ttm_session_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest<'a> {
    pub system_id: String,
    pub central_id: &'a str,
    pub session_id: &'a str,
    pub ttm_session_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicesRequest<'a> {
    pub system_id: String,
    pub central_id: &'a str,
    pub transmitter_id: &'a str,
    pub session_id: &'a str,
    pub ttm_session_id: &'a str,
    pub is_video_optional: &'static str,
    pub is_scenarios_zone_optional: &'static str,
    pub box_version: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest<'a> {
    pub system_id: String,
    pub session_id: &'a str,
    pub ttm_session_id: &'a str,
}

/// Logout carries the literal string "null" as system id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest<'a> {
    pub system_id: &'static str,
    pub session_id: &'a str,
}

impl<'a> LogoutRequest<'a> {
    pub fn new(session_id: &'a str) -> Self {
        Self {
            system_id: "null",
            session_id,
        }
    }
}

/// Serialize a request body.
pub fn encode<T: Serialize>(body: &T) -> Result<String> {
    Ok(serde_json::to_string(body)?)
}

/// A transmitter session id worth reclaiming: the raw reply body, exactly
/// 32 characters long.
pub fn recoverable_session_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (raw.chars().count() == TTM_SESSION_ID_LEN).then(|| raw.to_string())
}

/// A decoded reply: HTTP status plus its JSON body (`Null` when the body
/// was empty or unreadable on an error status).
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    /// Decode a reply. An unreachable service is fatal here; a 2xx reply
    /// that is not JSON is a malformed payload.
    pub fn parse(resp: &HttpResponse) -> Result<Self> {
        if resp.is_unreachable() {
            return Err(EOneError::Transport {
                reason: "Unable to connect to the cloud service".to_string(),
                status: 0,
                message: None,
            });
        }
        let body = if resp.body.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&resp.body) {
                Ok(value) => value,
                Err(e) if resp.is_success() => return Err(e.into()),
                Err(_) => Value::Null,
            }
        };
        Ok(Self {
            status: resp.status,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name).filter(|v| !v.is_null())
    }

    pub fn has(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Raw server `message` code.
    pub fn message(&self) -> Option<&str> {
        self.str_field("message")
    }

    pub fn server_message(&self) -> Option<ServerMessage> {
        self.message().and_then(ServerMessage::from_code)
    }

    pub fn details(&self) -> Option<&str> {
        self.str_field("details")
    }

    /// Deserialize the whole body into a typed reply.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.body)?)
    }

    /// The reply lacks what the call expected: a transport failure on an
    /// error status, a protocol mismatch otherwise.
    pub fn failure(&self, reason: impl Into<String>) -> EOneError {
        let reason = reason.into();
        let message = self.message().map(str::to_string);
        if self.is_success() {
            EOneError::Protocol {
                reason,
                status: self.status,
                message,
            }
        } else {
            EOneError::Transport {
                reason,
                status: self.status,
                message,
            }
        }
    }

    pub fn auth_error(&self, reason: impl Into<String>) -> EOneError {
        EOneError::Auth {
            reason: reason.into(),
            status: self.status,
            message: self.message().map(str::to_string),
        }
    }

    pub fn conflict(&self, reason: impl Into<String>) -> EOneError {
        EOneError::SessionConflict {
            reason: reason.into(),
            status: self.status,
            message: self.message().map(str::to_string),
        }
    }
}

/// Identifiers come back either as strings or as numbers.
fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(<D::Error as de::Error>::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}
