// MIT License - Copyright (c) 2021 TJForc
// Lazily fetched device inventory of the connected installation

use tracing::{debug, info};

use crate::constants::endpoint;
use crate::devices::DeviceInventory;
use crate::error::{EOneError, Result};
use crate::locale::Locale;
use crate::protocol::{self, DevicesRequest};
use crate::session::SessionManager;
use crate::transport::{JobPoller, Transport};

/// Device inventory cache.
///
/// Fetched through a report job on first use and kept until the catalog is
/// dropped; it is never refreshed behind the caller's back.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    inventory: Option<DeviceInventory>,
}

impl DeviceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog seeded with an inventory obtained elsewhere.
    pub fn with_inventory(inventory: DeviceInventory) -> Self {
        Self {
            inventory: Some(inventory),
        }
    }

    pub fn cached(&self) -> Option<&DeviceInventory> {
        self.inventory.as_ref()
    }

    /// Run the inventory job and replace the cache with its result.
    pub async fn fetch_inventory<T: Transport>(
        &mut self,
        session: &SessionManager<T>,
    ) -> Result<&DeviceInventory> {
        let ids = session.connected_ids()?;
        let config = session.config();
        let body = protocol::encode(&DevicesRequest {
            system_id: ids.system_id.to_string(),
            central_id: ids.central_id,
            transmitter_id: ids.transmitter_id,
            session_id: ids.session_id,
            ttm_session_id: ids.ttm_session_id,
            is_video_optional: "true",
            is_scenarios_zone_optional: "true",
            box_version: &config.box_version,
        })?;

        let poller = JobPoller::new(
            "device inventory",
            endpoint::GET_DEVICES_MULTIZONE,
            config.devices_poll_attempts,
        )?
        .with_interval(config.poll_interval);
        let payload = poller.run(session.transport(), &body).await?;

        let inventory = DeviceInventory::from_json_str(&payload)?;
        info!(
            "Device inventory loaded: {} sensor(s), {} command(s)",
            inventory.central_learning_zone.sensors.len(),
            inventory.central_learning_zone.commands.len()
        );
        Ok(&*self.inventory.insert(inventory))
    }

    /// The cached inventory, fetched first if needed.
    pub async fn inventory<T: Transport>(
        &mut self,
        session: &SessionManager<T>,
    ) -> Result<&DeviceInventory> {
        if self.inventory.is_none() {
            debug!("Device inventory not cached yet");
            self.fetch_inventory(session).await?;
        }
        self.inventory
            .as_ref()
            .ok_or_else(|| EOneError::Config("Device inventory unavailable".to_string()))
    }

    /// Display name of a product referenced by an event.
    pub async fn product_name<T: Transport>(
        &mut self,
        session: &SessionManager<T>,
        locale: &dyn Locale,
        family_id: i64,
        number: i64,
    ) -> Result<String> {
        Ok(self.inventory(session).await?.product_name(locale, family_id, number))
    }

    /// Display names of the given group ids.
    pub async fn group_names<T: Transport>(
        &mut self,
        session: &SessionManager<T>,
        ids: &[u8],
    ) -> Result<Vec<String>> {
        Ok(self.inventory(session).await?.group_names(ids))
    }

    /// Groups flagged for presence arming.
    pub async fn presence_groups<T: Transport>(
        &mut self,
        session: &SessionManager<T>,
    ) -> Result<Vec<u8>> {
        Ok(self.inventory(session).await?.presence_groups())
    }
}
