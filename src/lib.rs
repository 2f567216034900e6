// MIT License - Copyright (c) 2021 TJForc
// Client for the Diagral e-ONE alarm cloud service
//
//! # eone-cloud
//!
//! Drives a Diagral e-ONE alarm installation through the vendor's cloud
//! service: account login, installation selection, transmitter session,
//! arm/disarm commands, event log and device inventory.
//!
//! The HTTP layer sits behind the [`Transport`] trait; [`HttpTransport`] is
//! the `reqwest` implementation. Event texts come from a [`Locale`], usually
//! a [`LocaleMap`] loaded from the vendor's JSON locale file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use eone_cloud::{Account, AlarmController, ClientConfig, HttpTransport, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::builder().events_poll_attempts(50).build();
//!     let transport = HttpTransport::new(&config)?;
//!     let mut session = SessionManager::new(transport, config, Account::new("me@example.com", "secret"))?;
//!
//!     session.login().await?;
//!     session.list_systems().await?;
//!     session.select_system(0)?;
//!     session.fetch_configuration().await?;
//!     session.connect("1234").await?;
//!
//!     let mut alarm = AlarmController::new(session);
//!     let status = alarm.get_status().await?;
//!     println!("Alarm is {} on groups {:?}", status.state, status.group_indices());
//!     alarm.arm_partial(&[1, 3]).await?;
//!
//!     alarm.session_mut().logout().await?;
//!     Ok(())
//! }
//! ```

pub mod alarm;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod devices;
pub mod error;
pub mod events;
pub mod locale;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use alarm::AlarmController;
pub use catalog::DeviceCatalog;
pub use config::{Account, ClientConfig, ClientConfigBuilder};
pub use devices::{active_zones, ArmStatus, DeviceInventory, GroupSet, SystemState};
pub use error::{EOneError, Result, ServerMessage};
pub use events::{AppearFlag, DecodedEvent, EventTranslator, RawEvent};
pub use locale::{Locale, LocaleMap};
pub use protocol::{InstallationConfig, Role, SystemDescriptor};
pub use session::{Operation, SessionManager, SessionState};
pub use transport::{HttpResponse, HttpTransport, JobPoller, Method, Transport};
