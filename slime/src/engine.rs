//! Boundary traits for the hosting engine.
//!
//! The codec never constructs live chunks itself: materializing a decoded
//! [`ProtoChunk`](crate::chunk::ProtoChunk) drives these traits, and the
//! engine supplies the chunk object and the tag-to-entity factories behind
//! them. Factory failures are reported by value (`None` / `false`) so the
//! caller can skip the element and keep going.

use fastnbt::Value;

use crate::chunk::{BIOME_ARRAY_SIZE, HEIGHTMAP_SIZE, SECTIONS_PER_CHUNK};
use crate::coords::CCoords;
use crate::section::Section;

pub trait EngineWorld {
    type Chunk: EngineChunk;

    fn create_chunk(&mut self, coords: CCoords) -> Self::Chunk;
}

pub trait EngineChunk {
    /// Handle to an entity already spawned into this chunk, used to assemble
    /// riding chains.
    type EntityId: Copy;

    fn install_height_map(&mut self, height_map: &[i32; HEIGHTMAP_SIZE]);
    fn install_biomes(&mut self, biomes: &[u8; BIOME_ARRAY_SIZE]);
    fn install_sections(&mut self, sections: [Option<Section>; SECTIONS_PER_CHUNK]);

    /// Mark terrain and lighting as populated, with inhabited time zero.
    fn mark_populated(&mut self);

    /// Reconstruct an entity from its tag and add it to the chunk. `None`
    /// means the tag named an unknown or malformed entity type.
    fn spawn_entity(&mut self, tag: &Value) -> Option<Self::EntityId>;

    /// Mount `rider` onto `vehicle`.
    fn mount(&mut self, rider: Self::EntityId, vehicle: Self::EntityId);

    /// Reconstruct a tile entity from its tag; `false` on factory failure.
    fn spawn_tile_entity(&mut self, tag: &Value) -> bool;
}
