// MIT License - Copyright (c) 2021 TJForc
// Installation groups (1-8) and their bitmask encoding

use bitflags::bitflags;

bitflags! {
    /// Set of installation groups, one bit per group.
    ///
    /// Event codes carry groups as a byte where bit 0 is group 1 and bit 7
    /// is group 8.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GroupSet: u8 {
        const GROUP_1 = 0x01;
        const GROUP_2 = 0x02;
        const GROUP_3 = 0x04;
        const GROUP_4 = 0x08;
        const GROUP_5 = 0x10;
        const GROUP_6 = 0x20;
        const GROUP_7 = 0x40;
        const GROUP_8 = 0x80;
    }
}

/// Highest group index an installation can have.
pub const MAX_GROUP: u8 = 8;

impl GroupSet {
    /// Decode a group byte. Bits above 0x80 are ignored.
    pub fn from_mask(mask: i64) -> Self {
        Self::from_bits_truncate((mask & 0xFF) as u8)
    }

    /// Build a set from 1-based group indices. Indices outside 1..=8 are dropped.
    pub fn from_indices<I: IntoIterator<Item = u8>>(indices: I) -> Self {
        let mut set = Self::empty();
        for idx in indices {
            if (1..=MAX_GROUP).contains(&idx) {
                set |= Self::from_bits_truncate(1 << (idx - 1));
            }
        }
        set
    }

    /// 1-based indices of the groups in the set, ascending.
    pub fn indices(&self) -> Vec<u8> {
        (1..=MAX_GROUP)
            .filter(|idx| self.bits() & (1 << (idx - 1)) != 0)
            .collect()
    }
}

/// Decode an event's group byte into ascending 1-based group indices.
pub fn active_zones(mask: i64) -> Vec<u8> {
    GroupSet::from_mask(mask).indices()
}
