// MIT License - Copyright (c) 2021 TJForc
// Error taxonomy for the e-ONE cloud client

use std::fmt;

/// Machine-readable `message` codes returned by the cloud service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerMessage {
    /// The account does not exist.
    UserNotFound,
    /// The master code was refused by the transmitter.
    BadPinCode,
    /// Another transmitter session is already open.
    SessionAlreadyOpen,
    /// The transmitter session id is unknown or expired.
    InvalidSessionId,
}

impl ServerMessage {
    /// Parse a message code from a server reply.
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "error.connect.mydiagralusernotfound" => Some(Self::UserNotFound),
            "transmitter.connection.badpincode" => Some(Self::BadPinCode),
            "transmitter.connection.sessionalreadyopen" => Some(Self::SessionAlreadyOpen),
            "transmitter.error.invalidsessionid" => Some(Self::InvalidSessionId),
            _ => None,
        }
    }

    /// The wire string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserNotFound => "error.connect.mydiagralusernotfound",
            Self::BadPinCode => "transmitter.connection.badpincode",
            Self::SessionAlreadyOpen => "transmitter.connection.sessionalreadyopen",
            Self::InvalidSessionId => "transmitter.error.invalidsessionid",
        }
    }

    /// Human-readable description of the message.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UserNotFound => "User not found",
            Self::BadPinCode => "Master code invalid",
            Self::SessionAlreadyOpen => "Another session is already open",
            Self::InvalidSessionId => "Transmitter session expired",
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.as_str(), self.description())
    }
}

/// All errors that can occur while talking to the e-ONE cloud.
///
/// `status` is the HTTP status of the reply that triggered the error (0 when
/// the service could not be reached at all) and `message` the raw server
/// message code, when one was supplied.
#[derive(Debug, thiserror::Error)]
pub enum EOneError {
    #[error("Authentication failed: {reason} (http {status})")]
    Auth {
        reason: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session conflict: {reason} (http {status})")]
    SessionConflict {
        reason: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Protocol error: {reason} (http {status})")]
    Protocol {
        reason: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Transport error: {reason} (http {status})")]
    Transport {
        reason: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Transmitter is not connected to the Internet")]
    TransmitterUnreachable { status: u16 },

    #[error("{job} still pending after {attempts} attempts")]
    PollTimeout { job: &'static str, attempts: u32 },

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl EOneError {
    /// Whether this error belongs to the fatal category: the run against this
    /// installation cannot continue without operator action.
    pub fn is_fatal(&self) -> bool {
        match self {
            EOneError::Transport { status, .. } => *status == 0,
            EOneError::Json(_) => false,
            _ => true,
        }
    }

    /// Whether this error is transient and the call may be retried.
    pub fn is_retryable(&self) -> bool {
        !self.is_fatal()
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            EOneError::Auth { status, .. }
            | EOneError::SessionConflict { status, .. }
            | EOneError::Protocol { status, .. }
            | EOneError::Transport { status, .. }
            | EOneError::TransmitterUnreachable { status } => Some(*status),
            _ => None,
        }
    }

    /// Raw server message code attached to the error, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            EOneError::Auth { message, .. }
            | EOneError::SessionConflict { message, .. }
            | EOneError::Protocol { message, .. }
            | EOneError::Transport { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EOneError>;
