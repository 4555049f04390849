//! Block-state table used to repair legacy ids during section decode.
//!
//! Packed block ids are `kind << 4 | data`. The id tables of old engine
//! revisions were renumbered over time, so a stored pair may not name a state
//! the current table knows. Decode tolerates this: the block family for the
//! 8-bit kind translates the stale sub-data, or falls back to the family's
//! default. A corpus of historical ids must decode without corruption.

use std::collections::HashMap;

#[inline]
pub fn pack_block_id(kind: u16, data: u8) -> u16 {
    kind << 4 | data as u16
}

#[inline]
pub fn block_kind(id: u16) -> u16 {
    id >> 4
}

#[inline]
pub fn block_data(id: u16) -> u8 {
    (id & 0xF) as u8
}

/// Outcome of translating a legacy sub-data value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LegacyData {
    Remapped(u8),
    UseDefault,
}

#[derive(Clone, Debug)]
pub struct BlockFamily {
    default_data: u8,
    /// Bitmask over the 16 sub-data values; bit `d` set means `kind:d` is a
    /// recognized state.
    valid_data: u16,
    legacy_data: &'static [(u8, u8)],
}

impl BlockFamily {
    pub const fn new(default_data: u8, valid_data: u16, legacy_data: &'static [(u8, u8)]) -> Self {
        Self {
            default_data,
            valid_data,
            legacy_data,
        }
    }

    pub fn default_data(&self) -> u8 {
        self.default_data
    }

    pub fn is_valid_data(&self, data: u8) -> bool {
        self.valid_data >> data & 1 == 1
    }

    /// Two-step legacy lookup: a known historical value remaps, anything else
    /// falls back to the family default.
    pub fn translate(&self, data: u8) -> LegacyData {
        match self.legacy_data.iter().find(|(from, _)| *from == data) {
            Some((_, to)) => LegacyData::Remapped(*to),
            None => LegacyData::UseDefault,
        }
    }
}

// (kind, default sub-data, valid sub-data mask, legacy translations)
const VANILLA_FAMILIES: &[(u8, BlockFamily)] = &[
    (0, BlockFamily::new(0, 0x0001, &[])),  // air
    (1, BlockFamily::new(0, 0x007F, &[])),  // stone variants
    (2, BlockFamily::new(0, 0x0001, &[])),  // grass
    (3, BlockFamily::new(0, 0x0007, &[])),  // dirt
    (4, BlockFamily::new(0, 0x0001, &[])),  // cobblestone
    (5, BlockFamily::new(0, 0x003F, &[])),  // planks
    // Saplings kept a growth counter in the high bit of old saves.
    (
        6,
        BlockFamily::new(
            0,
            0x003F,
            &[(8, 0), (9, 1), (10, 2), (11, 3), (12, 4), (13, 5)],
        ),
    ),
    (7, BlockFamily::new(0, 0x0001, &[])),  // bedrock
    (8, BlockFamily::new(0, 0xFFFF, &[])),  // flowing water
    (9, BlockFamily::new(0, 0xFFFF, &[])),  // water
    (10, BlockFamily::new(0, 0xFFFF, &[])), // flowing lava
    (11, BlockFamily::new(0, 0xFFFF, &[])), // lava
    (12, BlockFamily::new(0, 0x0003, &[])), // sand
    (13, BlockFamily::new(0, 0x0001, &[])), // gravel
    (14, BlockFamily::new(0, 0x0001, &[])), // gold ore
    (15, BlockFamily::new(0, 0x0001, &[])), // iron ore
    (16, BlockFamily::new(0, 0x0001, &[])), // coal ore
    (17, BlockFamily::new(0, 0xFFFF, &[])), // log (species + axis)
    (18, BlockFamily::new(0, 0xFFFF, &[])), // leaves (species + decay)
    (19, BlockFamily::new(0, 0x0003, &[])), // sponge
    (20, BlockFamily::new(0, 0x0001, &[])), // glass
    (24, BlockFamily::new(0, 0x0007, &[])), // sandstone
    (35, BlockFamily::new(0, 0xFFFF, &[])), // wool
    (43, BlockFamily::new(0, 0xFFFF, &[])), // double stone slab
    (44, BlockFamily::new(0, 0xFFFF, &[])), // stone slab
    (45, BlockFamily::new(0, 0x0001, &[])), // bricks
    (46, BlockFamily::new(0, 0x0003, &[])), // tnt
    (47, BlockFamily::new(0, 0x0001, &[])), // bookshelf
    (49, BlockFamily::new(0, 0x0001, &[])), // obsidian
    // A data value of 0 was the pre-orientation torch encoding.
    (50, BlockFamily::new(5, 0x003E, &[(0, 5)])),
    (54, BlockFamily::new(2, 0x003C, &[(0, 2)])), // chest
    (56, BlockFamily::new(0, 0x0001, &[])),       // diamond ore
    (60, BlockFamily::new(0, 0x00FF, &[])),       // farmland
    (61, BlockFamily::new(2, 0x003C, &[(0, 2)])), // furnace
    (62, BlockFamily::new(2, 0x003C, &[(0, 2)])), // lit furnace
    (89, BlockFamily::new(0, 0x0001, &[])),       // glowstone
];

/// Known block families, keyed by 8-bit block kind. Constructed by the caller
/// and handed to the codec; there is no process-wide table.
#[derive(Clone, Debug, Default)]
pub struct BlockRegistry {
    families: HashMap<u8, BlockFamily>,
}

impl BlockRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn vanilla() -> Self {
        let mut registry = Self::default();
        for (kind, family) in VANILLA_FAMILIES {
            registry.register(*kind, family.clone());
        }
        registry
    }

    pub fn register(&mut self, kind: u8, family: BlockFamily) {
        self.families.insert(kind, family);
    }

    pub fn family(&self, kind: u8) -> Option<&BlockFamily> {
        self.families.get(&kind)
    }

    /// Whether a packed id names a recognized block state.
    pub fn is_state(&self, packed: u16) -> bool {
        let kind = block_kind(packed);
        u8::try_from(kind)
            .ok()
            .and_then(|kind| self.families.get(&kind))
            .is_some_and(|family| family.is_valid_data(block_data(packed)))
    }

    /// Resolve a stored (kind, sub-data) pair to a packed block id, applying
    /// the legacy repair path when the pair is not a recognized state. Never
    /// fails: a kind with no registered family passes through untouched.
    pub fn resolve(&self, kind: u8, data: u8) -> u16 {
        let packed = pack_block_id(kind as u16, data);
        if self.is_state(packed) {
            return packed;
        }
        let Some(family) = self.families.get(&kind) else {
            log::trace!("unknown block kind {}, keeping id {:#06x}", kind, packed);
            return packed;
        };
        let repaired = match family.translate(data) {
            LegacyData::Remapped(to) => to,
            LegacyData::UseDefault => family.default_data(),
        };
        log::trace!(
            "legacy block {}:{} resolved to {}:{}",
            kind,
            data,
            kind,
            repaired
        );
        pack_block_id(kind as u16, repaired)
    }
}
