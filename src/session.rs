// MIT License - Copyright (c) 2021 TJForc
// Authentication and transmitter session lifecycle

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{validate_poll_attempts, Account, ClientConfig};
use crate::constants::{endpoint, RIGHT_UNIVERSE_ALARMS, STATUS_OK};
use crate::devices::ArmStatus;
use crate::error::{EOneError, Result, ServerMessage};
use crate::protocol::{
    self, ConfigurationRequest, ConnectReply, ConnectRequest, DisconnectRequest, InstallationConfig,
    IsConnectedRequest, LastTtmSessionRequest, LoginRequest, LogoutRequest, Reply, SessionRequest,
    SystemDescriptor, SystemsReply,
};
use crate::transport::{Method, Transport};

/// Where a session stands. Moves forward through login, system selection,
/// configuration and transmitter connect; `Disconnected` can connect again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    SystemSelected,
    Configured,
    Connected,
    Disconnected,
    LoggedOut,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticated => "authenticated",
            SessionState::SystemSelected => "system selected",
            SessionState::Configured => "configured",
            SessionState::Connected => "connected",
            SessionState::Disconnected => "disconnected",
            SessionState::LoggedOut => "logged out",
        };
        f.write_str(s)
    }
}

/// Operations gated by the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    ListSystems,
    SelectSystem,
    FetchConfiguration,
    VerifyReachable,
    Connect,
    Disconnect,
    Logout,
    /// Status queries, state commands and report jobs
    Transmitter,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl SessionState {
    /// Whether `op` may be issued in this state.
    pub fn allows(&self, op: Operation) -> bool {
        use Operation as Op;
        use SessionState as S;
        match op {
            Op::Login => matches!(self, S::Unauthenticated | S::LoggedOut),
            Op::ListSystems | Op::SelectSystem => matches!(
                self,
                S::Authenticated | S::SystemSelected | S::Configured | S::Disconnected
            ),
            Op::FetchConfiguration => {
                matches!(self, S::SystemSelected | S::Configured | S::Disconnected)
            }
            Op::VerifyReachable | Op::Connect => {
                matches!(self, S::Configured | S::Connected | S::Disconnected)
            }
            Op::Disconnect | Op::Transmitter => *self == S::Connected,
            Op::Logout => !matches!(self, S::Unauthenticated | S::LoggedOut),
        }
    }
}

/// Identifiers every transmitter-level request carries.
#[derive(Debug, Clone, Copy)]
pub struct ConnectedIds<'a> {
    pub system_id: i64,
    pub session_id: &'a str,
    pub ttm_session_id: &'a str,
    pub transmitter_id: &'a str,
    pub central_id: &'a str,
}

/// Session context of one account against one installation.
///
/// Owns every token and cached reply of the session; nothing is shared
/// between instances. Calls are strictly sequential (`&mut self`).
pub struct SessionManager<T: Transport> {
    transport: T,
    config: ClientConfig,
    account: Account,
    state: SessionState,
    session_id: Option<String>,
    ttm_session_id: Option<String>,
    systems: Option<Vec<SystemDescriptor>>,
    selected: Option<usize>,
    installation: Option<InstallationConfig>,
    master_code: Option<String>,
    arm_status: Option<ArmStatus>,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: T, config: ClientConfig, account: Account) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            account,
            state: SessionState::Unauthenticated,
            session_id: None,
            ttm_session_id: None,
            systems: None,
            selected: None,
            installation: None,
            master_code: None,
            arm_status: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn ttm_session_id(&self) -> Option<&str> {
        self.ttm_session_id.as_deref()
    }

    pub fn systems(&self) -> Option<&[SystemDescriptor]> {
        self.systems.as_deref()
    }

    pub fn selected_system(&self) -> Option<&SystemDescriptor> {
        let idx = self.selected?;
        self.systems.as_ref()?.get(idx)
    }

    pub fn installation(&self) -> Option<&InstallationConfig> {
        self.installation.as_ref()
    }

    /// Last armed state reported by the server.
    pub fn arm_status(&self) -> Option<ArmStatus> {
        self.arm_status
    }

    pub(crate) fn set_arm_status(&mut self, status: ArmStatus) {
        self.arm_status = Some(status);
    }

    /// Change the poll bound of event history jobs.
    pub fn set_events_retry(&mut self, attempts: u32) -> Result<()> {
        validate_poll_attempts(attempts)?;
        self.config.events_poll_attempts = attempts;
        Ok(())
    }

    /// Reject `op` before any I/O when the session is not ready for it.
    pub fn ensure(&self, op: Operation) -> Result<()> {
        if self.state.allows(op) {
            Ok(())
        } else {
            Err(EOneError::Config(format!(
                "{op} is not allowed while the session is {}",
                self.state
            )))
        }
    }

    /// Identifiers of the connected transmitter session.
    pub fn connected_ids(&self) -> Result<ConnectedIds<'_>> {
        self.ensure(Operation::Transmitter)?;
        match (
            self.selected_system(),
            self.session_id.as_deref(),
            self.ttm_session_id.as_deref(),
            self.installation.as_ref(),
        ) {
            (Some(system), Some(session_id), Some(ttm_session_id), Some(installation)) => {
                Ok(ConnectedIds {
                    system_id: system.id,
                    session_id,
                    ttm_session_id,
                    transmitter_id: &installation.transmitter_id,
                    central_id: &installation.central_id,
                })
            }
            _ => Err(EOneError::Config("No transmitter session".to_string())),
        }
    }

    /// POST a JSON body and decode the reply.
    pub(crate) async fn call(&self, path: &str, body: &str) -> Result<Reply> {
        let resp = self.transport.send(Method::Post, path, Some(body)).await?;
        Reply::parse(&resp)
    }

    fn require_session_id(&self) -> Result<&str> {
        self.session_id
            .as_deref()
            .ok_or_else(|| EOneError::Config("Not logged in".to_string()))
    }

    fn require_system(&self) -> Result<&SystemDescriptor> {
        self.selected_system()
            .ok_or_else(|| EOneError::Config("No system selected".to_string()))
    }

    fn require_installation(&self) -> Result<&InstallationConfig> {
        self.installation
            .as_ref()
            .ok_or_else(|| EOneError::Config("Installation configuration not fetched".to_string()))
    }

    /// Exchange the account credentials for a cloud session.
    pub async fn login(&mut self) -> Result<()> {
        self.ensure(Operation::Login)?;
        let body = protocol::encode(&LoginRequest {
            username: &self.account.username,
            password: &self.account.password,
        })?;
        let reply = self.call(endpoint::LOGIN, &body).await?;

        match reply.str_field("sessionId") {
            Some(session_id) => {
                self.session_id = Some(session_id.to_string());
                self.state = SessionState::Authenticated;
                info!("Logged in as {}", self.account.username);
                Ok(())
            }
            None if reply.server_message() == Some(ServerMessage::UserNotFound) => {
                Err(reply.auth_error(format!("Account {} not found", self.account.username)))
            }
            None => Err(reply.auth_error("sessionId is not in the response")),
        }
    }

    /// List the installations of the account.
    pub async fn list_systems(&mut self) -> Result<&[SystemDescriptor]> {
        self.ensure(Operation::ListSystems)?;
        let body = protocol::encode(&SessionRequest {
            session_id: self.require_session_id()?,
        })?;
        let reply = self.call(endpoint::GET_SYSTEMS, &body).await?;
        if !reply.has("diagralId") {
            return Err(reply.failure("diagralId is not in the response"));
        }
        let systems: SystemsReply = reply.decode()?;
        debug!("{} system(s) on the account", systems.systems.len());
        self.selected = None;
        self.installation = None;
        self.state = SessionState::Authenticated;
        Ok(self.systems.insert(systems.systems).as_slice())
    }

    /// Pick the installation to work on, by position in the system list.
    pub fn select_system(&mut self, index: usize) -> Result<()> {
        self.ensure(Operation::SelectSystem)?;
        let systems = self
            .systems
            .as_ref()
            .ok_or_else(|| EOneError::Config("Systems must be listed first".to_string()))?;
        let system = systems
            .get(index)
            .ok_or_else(|| EOneError::Config(format!("System {index} does not exist")))?;
        if !system.installation_complete {
            return Err(EOneError::Config(format!(
                "Installation of system {index} is not complete"
            )));
        }
        info!("Selected system {} (role {})", index, system.role);
        self.selected = Some(index);
        self.installation = None;
        self.state = SessionState::SystemSelected;
        Ok(())
    }

    /// Fetch transmitter and central ids of the selected installation.
    pub async fn fetch_configuration(&mut self) -> Result<&InstallationConfig> {
        self.ensure(Operation::FetchConfiguration)?;
        let system = self.require_system()?;
        let role = system.role;
        let body = protocol::encode(&ConfigurationRequest {
            system_id: system.id,
            role: role.as_u8(),
            session_id: self.require_session_id()?,
        })?;
        let reply = self.call(endpoint::GET_CONFIGURATION, &body).await?;
        if !reply.has("transmitterId") || !reply.has("centralId") {
            return Err(reply.failure("transmitterId and/or centralId is not in the response"));
        }
        let installation: InstallationConfig = reply.decode()?;
        if !role.is_master() && !installation.has_right(RIGHT_UNIVERSE_ALARMS) {
            return Err(reply.auth_error("This account has no alarm rights"));
        }
        debug!("Transmitter {} / central {}", installation.transmitter_id, installation.central_id);
        self.state = SessionState::Configured;
        Ok(&*self.installation.insert(installation))
    }

    /// Check that the transmitter is online. No side effects.
    pub async fn verify_reachable(&self) -> Result<()> {
        self.ensure(Operation::VerifyReachable)?;
        let body = protocol::encode(&IsConnectedRequest {
            transmitter_id: &self.require_installation()?.transmitter_id,
            session_id: self.require_session_id()?,
        })?;
        let reply = self.call(endpoint::IS_CONNECTED, &body).await?;
        if !reply.is_success() {
            return Err(reply.failure("Unable to know if the transmitter is connected"));
        }
        if reply.field("isConnected").is_some_and(crate::devices::inventory::truthy) {
            debug!("Transmitter connected to the Internet");
            Ok(())
        } else {
            Err(EOneError::TransmitterUnreachable {
                status: reply.status,
            })
        }
    }

    /// Open a transmitter session with the installation's master code.
    pub async fn connect(&mut self, master_code: &str) -> Result<()> {
        self.ensure(Operation::Connect)?;
        if !master_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(EOneError::Config(
                "Master code only supports digits".to_string(),
            ));
        }
        self.master_code = Some(master_code.to_string());
        self.verify_reachable().await?;
        self.open_session().await
    }

    /// Open a new transmitter session with the stored master code, after
    /// the server dropped the previous one.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.ensure(Operation::Connect)?;
        if self.master_code.is_none() {
            return Err(EOneError::Config("Never connected".to_string()));
        }
        self.ttm_session_id = None;
        self.open_session().await
    }

    async fn open_session(&mut self) -> Result<()> {
        let max_attempts = self.config.max_connect_attempts;
        let mut last_conflict = None;

        for attempt in 1..=max_attempts {
            let system = self.require_system()?;
            let (system_id, role) = (system.id, system.role);
            let body = protocol::encode(&ConnectRequest {
                master_code: self.master_code.as_deref().unwrap_or_default(),
                transmitter_id: &self.require_installation()?.transmitter_id,
                system_id,
                role: role.as_u8(),
                session_id: self.require_session_id()?,
            })?;
            let reply = self.call(endpoint::CONNECT, &body).await?;

            if reply.has("ttmSessionId") {
                let connected: ConnectReply = reply.decode()?;
                self.ttm_session_id = Some(connected.ttm_session_id);
                self.state = SessionState::Connected;
                match connected.system_state {
                    Some(state) => {
                        self.arm_status = Some(ArmStatus::new(state, &connected.groups));
                        info!("Transmitter session open, alarm is {}", state);
                    }
                    None => info!("Transmitter session open, alarm state not reported"),
                }
                return Ok(());
            }

            match reply.server_message() {
                Some(ServerMessage::BadPinCode) => {
                    return Err(reply.auth_error("Master code invalid"));
                }
                Some(ServerMessage::SessionAlreadyOpen) if role.is_master() => {
                    warn!(
                        "Another session is open ({}/{}), reclaiming it",
                        attempt, max_attempts
                    );
                    match self.last_ttm_session_id().await? {
                        Some(stale) => {
                            match self.disconnect_session(&stale).await {
                                Err(e) if e.status() == Some(0) => return Err(e),
                                Err(e) => warn!("Unable to close the previous session: {}", e),
                                Ok(()) => {}
                            }
                        }
                        None => debug!("No recoverable session, retrying"),
                    }
                    last_conflict = Some(reply);
                }
                Some(ServerMessage::SessionAlreadyOpen) => {
                    let details = reply.details().unwrap_or_default().to_string();
                    return Err(reply.conflict(format!("Another session is already open. {details}")));
                }
                _ => return Err(reply.failure("ttmSessionId is not in the response")),
            }
        }

        let reason = format!("Session still open after {max_attempts} attempts");
        Err(match last_conflict {
            Some(reply) => reply.conflict(reason),
            None => EOneError::SessionConflict {
                reason,
                status: 0,
                message: None,
            },
        })
    }

    /// Last transmitter session opened on the installation, when the server
    /// hands back one worth reclaiming.
    pub async fn last_ttm_session_id(&self) -> Result<Option<String>> {
        let body = protocol::encode(&LastTtmSessionRequest {
            system_id: self.require_system()?.id,
            session_id: self.require_session_id()?,
        })?;
        let resp = self
            .transport
            .send(Method::Post, endpoint::LAST_TTM_SESSION_ID, Some(&body))
            .await?;
        if resp.is_unreachable() {
            return Err(EOneError::Transport {
                reason: "Unable to request the previous session".to_string(),
                status: 0,
                message: None,
            });
        }
        let found = protocol::recoverable_session_id(&resp.body);
        if found.is_none() {
            debug!("No previous session to reclaim (http {})", resp.status);
        }
        Ok(found)
    }

    /// Close a transmitter session: the current one by default, or the
    /// given one.
    pub async fn disconnect(&mut self, ttm_session_id: Option<&str>) -> Result<()> {
        let target = match ttm_session_id {
            Some(id) => id.to_string(),
            None => {
                self.ensure(Operation::Disconnect)?;
                self.ttm_session_id
                    .clone()
                    .ok_or_else(|| EOneError::Config("No transmitter session".to_string()))?
            }
        };
        self.disconnect_session(&target).await?;
        if self.ttm_session_id.as_deref() == Some(target.as_str()) {
            self.ttm_session_id = None;
            self.state = SessionState::Disconnected;
            info!("Transmitter session closed");
        }
        Ok(())
    }

    async fn disconnect_session(&self, ttm_session_id: &str) -> Result<()> {
        let body = protocol::encode(&DisconnectRequest {
            system_id: self.require_system()?.id.to_string(),
            session_id: self.require_session_id()?,
            ttm_session_id,
        })?;
        let reply = self.call(endpoint::DISCONNECT, &body).await?;
        if reply.str_field("status") == Some(STATUS_OK) {
            Ok(())
        } else {
            Err(reply.failure("Disconnect not acknowledged"))
        }
    }

    /// Close the transmitter session, if any, then the cloud session.
    pub async fn logout(&mut self) -> Result<()> {
        self.ensure(Operation::Logout)?;
        if self.state == SessionState::Connected {
            if let Err(e) = self.disconnect(None).await {
                warn!("Disconnect before logout failed: {}", e);
            }
        }
        let body = protocol::encode(&LogoutRequest::new(self.require_session_id()?))?;
        let reply = self.call(endpoint::LOGOUT, &body).await?;
        if reply.str_field("status") != Some(STATUS_OK) {
            return Err(reply.failure("Logout not acknowledged"));
        }
        self.session_id = None;
        self.ttm_session_id = None;
        self.state = SessionState::LoggedOut;
        info!("Logged out");
        Ok(())
    }
}
