// MIT License - Copyright (c) 2021 TJForc
// Installation data model

pub mod group;
pub mod inventory;
pub mod system;

pub use group::{active_zones, GroupSet};
pub use inventory::{Device, DeviceInventory};
pub use system::{ArmStatus, SystemState};
