// MIT License - Copyright (c) 2021 TJForc
// Arm, disarm and status of the connected installation

use tracing::{debug, info, warn};

use crate::catalog::DeviceCatalog;
use crate::constants::{endpoint, COMMAND_OK, DEFAULT_EVENTS_START, EVENT_DATE_FORMAT};
use crate::devices::{ArmStatus, SystemState};
use crate::error::{Result, ServerMessage};
use crate::events::{filter_by_date, AppearFlag, DecodedEvent, EventTranslator, RawEvent};
use crate::locale::Locale;
use crate::protocol::{self, HistoryRequest, StateCommandRequest, SystemStateReply, SystemStateRequest};
use crate::session::{Operation, SessionManager};
use crate::transport::{JobPoller, Transport};

/// Drives the alarm of a connected session.
///
/// The armed state it reports only ever comes from the server: a status
/// reply or an acknowledged command.
pub struct AlarmController<T: Transport> {
    session: SessionManager<T>,
    catalog: DeviceCatalog,
    appear: AppearFlag,
}

impl<T: Transport> AlarmController<T> {
    pub fn new(session: SessionManager<T>) -> Self {
        Self {
            session,
            catalog: DeviceCatalog::new(),
            appear: AppearFlag::default(),
        }
    }

    pub fn session(&self) -> &SessionManager<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager<T> {
        &mut self.session
    }

    pub fn catalog(&self) -> &DeviceCatalog {
        &self.catalog
    }

    pub fn into_session(self) -> SessionManager<T> {
        self.session
    }

    /// How events with both an appear and a disappear text are rendered.
    pub fn set_appear_flag(&mut self, appear: AppearFlag) {
        self.appear = appear;
    }

    /// Last armed state the server reported, without asking again.
    pub fn arm_status(&self) -> Option<ArmStatus> {
        self.session.arm_status()
    }

    /// Ask the central for its armed state.
    ///
    /// An expired transmitter session is reopened once with the stored
    /// master code before giving up.
    pub async fn get_status(&mut self) -> Result<ArmStatus> {
        self.session.ensure(Operation::Transmitter)?;
        let mut reconnected = false;
        loop {
            let body = {
                let ids = self.session.connected_ids()?;
                protocol::encode(&SystemStateRequest {
                    session_id: ids.session_id,
                    central_id: ids.central_id,
                    ttm_session_id: ids.ttm_session_id,
                })?
            };
            let reply = self.session.call(endpoint::GET_SYSTEM_STATE, &body).await?;

            if reply.has("systemState") {
                let state: SystemStateReply = reply.decode()?;
                let status = ArmStatus::new(state.system_state, &state.groups);
                debug!("Alarm is {} (groups {:?})", status.state, status.group_indices());
                self.session.set_arm_status(status);
                return Ok(status);
            }

            match reply.server_message() {
                Some(ServerMessage::InvalidSessionId) if !reconnected => {
                    warn!("Transmitter session expired, reconnecting");
                    self.session.reconnect().await?;
                    reconnected = true;
                }
                _ => return Err(reply.failure("systemState is not in the response")),
            }
        }
    }

    /// Arm the given groups (1-based), as is.
    pub async fn arm_partial(&mut self, groups: &[u8]) -> Result<()> {
        info!("Arming groups {:?}", groups);
        self.send_command(SystemState::Group, groups).await
    }

    /// Arm the groups flagged for presence arming. Returns those groups.
    pub async fn arm_presence(&mut self) -> Result<Vec<u8>> {
        self.session.ensure(Operation::Transmitter)?;
        let groups = self.catalog.presence_groups(&self.session).await?;
        self.arm_partial(&groups).await?;
        Ok(groups)
    }

    /// Arm every group.
    pub async fn arm_complete(&mut self) -> Result<()> {
        info!("Arming the whole installation");
        self.send_command(SystemState::On, &[]).await
    }

    /// Disarm everything, unless the alarm already is.
    pub async fn disarm_complete(&mut self) -> Result<()> {
        let status = self.get_status().await?;
        if status.is_off() {
            info!("Alarm already disarmed, nothing to do");
            return Ok(());
        }
        info!("Disarming the whole installation");
        self.send_command(SystemState::Off, &[]).await
    }

    async fn send_command(&mut self, state: SystemState, groups: &[u8]) -> Result<()> {
        let body = {
            let ids = self.session.connected_ids()?;
            protocol::encode(&StateCommandRequest::new(
                state,
                groups,
                ids.session_id,
                ids.ttm_session_id,
            ))?
        };
        let reply = self.session.call(endpoint::STATE_COMMAND, &body).await?;
        if reply.str_field("commandStatus") != Some(COMMAND_OK) {
            return Err(reply.failure(format!("Command {state} not acknowledged")));
        }
        self.session.set_arm_status(ArmStatus::new(state, groups));
        info!("Alarm is now {}", state);
        Ok(())
    }

    /// Display names of status group ids.
    pub async fn group_names(&mut self, ids: &[u8]) -> Result<Vec<String>> {
        self.session.ensure(Operation::Transmitter)?;
        self.catalog.group_names(&self.session, ids).await
    }

    /// The whole event log, undecoded.
    pub async fn raw_events(&self) -> Result<Vec<RawEvent>> {
        let body = {
            let ids = self.session.connected_ids()?;
            protocol::encode(&HistoryRequest {
                system_id: ids.system_id.to_string(),
                central_id: ids.central_id,
                session_id: ids.session_id,
                ttm_session_id: ids.ttm_session_id,
            })?
        };
        let config = self.session.config();
        let poller = JobPoller::new("event history", endpoint::GET_HISTORY, config.events_poll_attempts)?
            .with_interval(config.poll_interval);
        let payload = poller.run(self.session.transport(), &body).await?;
        let events: Vec<RawEvent> = serde_json::from_str(&payload)?;
        debug!("{} raw event(s)", events.len());
        Ok(events)
    }

    /// Readable events dated within `[start, end]`.
    ///
    /// `start` defaults to 2010-01-01 00:00:00 and `end` to now, both in
    /// `YYYY-MM-DD HH:MM:SS`.
    pub async fn events(
        &mut self,
        locale: &dyn Locale,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<DecodedEvent>> {
        let start = start.unwrap_or(DEFAULT_EVENTS_START).to_string();
        let end = match end {
            Some(end) => end.to_string(),
            None => chrono::Local::now().format(EVENT_DATE_FORMAT).to_string(),
        };

        let events = filter_by_date(self.raw_events().await?, &start, &end);
        let inventory = self.catalog.inventory(&self.session).await?;
        let decoded = EventTranslator::new(inventory, locale)
            .with_appear_flag(self.appear)
            .translate_all(&events);
        info!("{} event(s) between {} and {}", decoded.len(), start, end);
        Ok(decoded)
    }
}
