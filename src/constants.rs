// MIT License - Copyright (c) 2021 TJForc
// Wire constants of the e-ONE cloud protocol

/// Default service root. Every endpoint path is appended to it.
pub const DEFAULT_BASE_URL: &str = "https://appv3.tt-monitor.com/topaze";

/// Client identity expected by the service.
pub const DEFAULT_APP_VERSION: &str = "1.5.0";
pub const DEFAULT_VENDOR: &str = "diagral";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 10_2 like Mac OS X) \
    AppleWebKit/602.3.12 (KHTML, like Gecko) Version/10.0 Mobile/14C92 Safari/602.1";
pub const ACCEPT: &str = "application/json, text/plain, */*";
pub const CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Box version pinned in the device inventory request.
pub const DEFAULT_BOX_VERSION: &str = "1.3.0";

/// Endpoint paths, relative to the base URL.
pub mod endpoint {
    pub const LOGIN: &str = "/authenticate/login";
    pub const LAST_TTM_SESSION_ID: &str = "/authenticate/getLastTtmSessionId";
    pub const CONNECT: &str = "/authenticate/connect";
    pub const DISCONNECT: &str = "/authenticate/disconnect";
    pub const LOGOUT: &str = "/authenticate/logout";
    pub const GET_SYSTEMS: &str = "/configuration/getSystems";
    pub const GET_CONFIGURATION: &str = "/configuration/getConfiguration";
    pub const GET_DEVICES_MULTIZONE: &str = "/configuration/v2/getDevicesMultizone";
    pub const IS_CONNECTED: &str = "/installation/isConnected";
    pub const GET_SYSTEM_STATE: &str = "/status/getSystemState";
    pub const GET_HISTORY: &str = "/status/v2/getHistory";
    pub const STATE_COMMAND: &str = "/action/stateCommand";
}

/// `status` of a finished asynchronous job.
pub const JOB_STATUS_DONE: &str = "request_status_done";

/// `commandStatus` of an acknowledged state command.
pub const COMMAND_OK: &str = "CMD_OK";

/// `status` of a successful disconnect/logout.
pub const STATUS_OK: &str = "OK";

/// Group count sent with every state command, whatever the installation size.
pub const NB_GROUPS: &str = "4";

/// Right a standard (non-master) user needs to drive the alarm.
pub const RIGHT_UNIVERSE_ALARMS: &str = "UNIVERSE_ALARMS";

/// Length of a recoverable transmitter session id.
pub const TTM_SESSION_ID_LEN: usize = 32;

/// Poll bound used for both asynchronous jobs unless configured otherwise.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 100;

/// Attempts at opening a transmitter session before a conflict is final.
pub const DEFAULT_MAX_CONNECT_ATTEMPTS: u32 = 3;

/// Per-request timeouts, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Lower bound of the event date range when none is given.
pub const DEFAULT_EVENTS_START: &str = "2010-01-01 00:00:00";

/// Format both event dates and range bounds are compared in.
pub const EVENT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
