// MIT License - Copyright (c) 2021 TJForc
// Client configuration

use std::fmt;
use std::time::Duration;

use crate::constants::{
    DEFAULT_APP_VERSION, DEFAULT_BASE_URL, DEFAULT_BOX_VERSION, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_MAX_CONNECT_ATTEMPTS, DEFAULT_POLL_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_USER_AGENT, DEFAULT_VENDOR,
};
use crate::error::{EOneError, Result};

/// Cloud account credentials.
#[derive(Clone)]
pub struct Account {
    pub username: String,
    pub password: String,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for talking to the e-ONE cloud.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root every endpoint path is appended to
    pub base_url: String,
    /// `X-App-Version` header
    pub app_version: String,
    /// `X-Vendor` header
    pub vendor: String,
    /// `User-Agent` header
    pub user_agent: String,
    /// TCP connect timeout of a single call
    pub connect_timeout: Duration,
    /// Overall timeout of a single call
    pub request_timeout: Duration,
    /// Maximum polls of an event history job
    pub events_poll_attempts: u32,
    /// Maximum polls of a device inventory job
    pub devices_poll_attempts: u32,
    /// Pause between two polls of the same job (default: none)
    pub poll_interval: Duration,
    /// Attempts at opening a transmitter session when one is already open
    pub max_connect_attempts: u32,
    /// Box version announced in the device inventory request
    pub box_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
            vendor: DEFAULT_VENDOR.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            events_poll_attempts: DEFAULT_POLL_ATTEMPTS,
            devices_poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval: Duration::ZERO,
            max_connect_attempts: DEFAULT_MAX_CONNECT_ATTEMPTS,
            box_version: DEFAULT_BOX_VERSION.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Reject values the protocol cannot work with.
    pub fn validate(&self) -> Result<()> {
        validate_poll_attempts(self.events_poll_attempts)?;
        validate_poll_attempts(self.devices_poll_attempts)?;
        if self.max_connect_attempts == 0 {
            return Err(EOneError::Config(
                "max_connect_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A poll bound of zero would give up before asking the server once.
pub fn validate_poll_attempts(attempts: u32) -> Result<()> {
    if attempts == 0 {
        return Err(EOneError::Config(
            "Number of poll attempts must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Builder for ClientConfig.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.config.app_version = version.into();
        self
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.config.vendor = vendor.into();
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn events_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.events_poll_attempts = attempts;
        self
    }

    pub fn devices_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.devices_poll_attempts = attempts;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn max_connect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_connect_attempts = attempts;
        self
    }

    pub fn box_version(mut self, version: impl Into<String>) -> Self {
        self.config.box_version = version.into();
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
