// MIT License - Copyright (c) 2021 TJForc
// Armed state of an installation

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::devices::group::GroupSet;

/// Armed state reported by the central, and sent back in state commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemState {
    /// Disarmed
    Off,
    /// Some groups armed
    Group,
    /// Fully armed
    On,
}

impl SystemState {
    /// The wire string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Group => "group",
            Self::On => "on",
        }
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Armed state plus the armed groups.
///
/// Only ever built from a server reply (connect, status query or command
/// acknowledgement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmStatus {
    pub state: SystemState,
    pub groups: GroupSet,
}

impl ArmStatus {
    pub fn new(state: SystemState, groups: &[u8]) -> Self {
        Self {
            state,
            groups: GroupSet::from_indices(groups.iter().copied()),
        }
    }

    pub fn is_off(&self) -> bool {
        self.state == SystemState::Off
    }

    /// 1-based indices of the armed groups.
    pub fn group_indices(&self) -> Vec<u8> {
        self.groups.indices()
    }
}
