use std::io::{Read, Write};

use byteorder::{BigEndian, WriteBytesExt};
use fastnbt::Value;

use crate::bits::{BitSet, read_exact, read_i32_array};
use crate::coords::CCoords;
use crate::engine::{EngineChunk, EngineWorld};
use crate::error::SlimeError;
use crate::registry::BlockRegistry;
use crate::section::Section;
use crate::tag::{self, TagError};

pub const SECTIONS_PER_CHUNK: usize = 16;
pub const HEIGHTMAP_SIZE: usize = 256;
pub const BIOME_ARRAY_SIZE: usize = 256;
const SECTION_MASK_BYTES: usize = SECTIONS_PER_CHUNK / 8;

/// Engine-independent decoded chunk. Identity is the chunk coordinate alone:
/// two proto-chunks are equal iff their coordinates match.
#[derive(Clone, Debug)]
pub struct ProtoChunk {
    coords: CCoords,
    sections: [Option<Section>; SECTIONS_PER_CHUNK],
    biomes: [u8; BIOME_ARRAY_SIZE],
    height_map: [i32; HEIGHTMAP_SIZE],
    entities: Vec<Value>,
    tile_entities: Vec<Value>,
}

impl PartialEq for ProtoChunk {
    fn eq(&self, other: &Self) -> bool {
        self.coords == other.coords
    }
}

impl Eq for ProtoChunk {}

impl std::hash::Hash for ProtoChunk {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.coords.hash(state);
    }
}

impl ProtoChunk {
    pub fn new(coords: CCoords) -> Self {
        Self {
            coords,
            sections: Default::default(),
            biomes: [0; BIOME_ARRAY_SIZE],
            height_map: [0; HEIGHTMAP_SIZE],
            entities: Vec::new(),
            tile_entities: Vec::new(),
        }
    }

    pub fn coords(&self) -> CCoords {
        self.coords
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections[index].as_ref()
    }

    pub fn set_section(&mut self, index: usize, section: Section) {
        self.sections[index] = Some(section);
    }

    pub fn biomes(&self) -> &[u8; BIOME_ARRAY_SIZE] {
        &self.biomes
    }

    pub fn set_biomes(&mut self, biomes: [u8; BIOME_ARRAY_SIZE]) {
        self.biomes = biomes;
    }

    pub fn height_map(&self) -> &[i32; HEIGHTMAP_SIZE] {
        &self.height_map
    }

    pub fn set_height_map(&mut self, height_map: [i32; HEIGHTMAP_SIZE]) {
        self.height_map = height_map;
    }

    /// A chunk with no populated section has nothing to persist.
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(Option::is_none)
    }

    /// 16-bit section-presence mask, bit i set for a populated section i.
    pub fn section_mask(&self) -> u16 {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, section)| section.is_some())
            .fold(0u16, |mask, (index, _)| mask | 1 << index)
    }

    pub fn entities(&self) -> &[Value] {
        &self.entities
    }

    pub fn tile_entities(&self) -> &[Value] {
        &self.tile_entities
    }

    pub fn attach_entity(&mut self, tag: Value) {
        self.entities.push(tag);
    }

    pub fn attach_tile_entity(&mut self, tag: Value) {
        self.tile_entities.push(tag);
    }

    /// Encode this chunk's slice of the bulk chunk payload: heightmap, biome
    /// array, section-presence mask, then each populated section in ascending
    /// index order.
    pub(crate) fn write_payload(&self, writer: &mut impl Write) -> Result<(), SlimeError> {
        for &height in &self.height_map {
            writer.write_i32::<BigEndian>(height)?;
        }
        writer.write_all(&self.biomes)?;

        let mut mask = BitSet::with_capacity(SECTIONS_PER_CHUNK);
        for (index, section) in self.sections.iter().enumerate() {
            if section.is_some() {
                mask.set(index);
            }
        }
        writer.write_all(&mask.to_fixed_bytes(SECTION_MASK_BYTES))?;

        for section in self.sections.iter().flatten() {
            section.encode(writer)?;
        }
        Ok(())
    }

    /// Decode one chunk from the bulk chunk payload. Sections without a set
    /// presence bit stay absent.
    pub(crate) fn read_payload(
        reader: &mut impl Read,
        coords: CCoords,
        registry: &BlockRegistry,
    ) -> Result<Self, SlimeError> {
        let mut chunk = Self::new(coords);

        let heights = read_i32_array(reader, HEIGHTMAP_SIZE, "chunk heightmap")?;
        chunk.height_map.copy_from_slice(&heights);
        read_exact(reader, &mut chunk.biomes, "chunk biomes")?;

        let mut mask_bytes = [0u8; SECTION_MASK_BYTES];
        read_exact(reader, &mut mask_bytes, "section presence mask")?;
        let mask = BitSet::from_bytes(&mask_bytes);

        for index in 0..SECTIONS_PER_CHUNK {
            if mask.get(index) {
                chunk.sections[index] = Some(Section::decode(reader, index, registry)?);
            }
        }
        Ok(chunk)
    }

    /// Build the engine's live chunk: install terrain, then replay tile
    /// entities and entities. Individual reconstruction failures are skipped
    /// with a warning; a failed mount ends its riding chain but keeps the
    /// entities already mounted.
    pub fn materialize<W: EngineWorld>(&self, world: &mut W) -> W::Chunk {
        let mut chunk = world.create_chunk(self.coords);
        chunk.install_height_map(&self.height_map);
        chunk.install_biomes(&self.biomes);
        chunk.install_sections(self.sections.clone());
        chunk.mark_populated();

        for tag in &self.tile_entities {
            if !chunk.spawn_tile_entity(tag) {
                log::warn!("skipping unreconstructable tile entity in {}", self.coords);
            }
        }

        for tag in &self.entities {
            let Some(mut rider) = chunk.spawn_entity(tag) else {
                log::warn!("skipping unreconstructable entity in {}", self.coords);
                continue;
            };
            let mut current = tag;
            loop {
                let riding = match tag::get_compound(current, "Riding") {
                    Ok(riding) => riding,
                    Err(TagError::MissingKey(_)) => break,
                    Err(err) => {
                        log::warn!("bad riding tag in {}: {}", self.coords, err);
                        break;
                    }
                };
                let Some(vehicle) = chunk.spawn_entity(riding) else {
                    log::warn!("riding chain broken in {}", self.coords);
                    break;
                };
                chunk.mount(rider, vehicle);
                rider = vehicle;
                current = riding;
            }
        }

        chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::pack_block_id;

    fn compound(pairs: Vec<(&str, Value)>) -> Value {
        Value::Compound(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        )
    }

    fn entity(name: &str, riding: Option<Value>) -> Value {
        let mut pairs = vec![("id", Value::String(name.to_owned()))];
        if let Some(riding) = riding {
            pairs.push(("Riding", riding));
        }
        compound(pairs)
    }

    fn test_chunk() -> ProtoChunk {
        let mut chunk = ProtoChunk::new(CCoords::new(2, -3));
        let mut heights = [0i32; HEIGHTMAP_SIZE];
        let mut biomes = [0u8; BIOME_ARRAY_SIZE];
        for i in 0..HEIGHTMAP_SIZE {
            heights[i] = 60 + (i % 16) as i32;
            biomes[i] = (i % 7) as u8;
        }
        chunk.set_height_map(heights);
        chunk.set_biomes(biomes);

        let mut bottom = Section::new(0);
        bottom.set_block(0, 0, 0, pack_block_id(7, 0));
        bottom.set_block(8, 4, 8, pack_block_id(1, 0));
        chunk.set_section(0, bottom);
        let mut top = Section::new(9);
        top.set_block(15, 15, 15, pack_block_id(35, 11));
        chunk.set_section(9, top);
        chunk
    }

    #[test]
    fn test_identity_by_coords() {
        let a = test_chunk();
        let mut b = ProtoChunk::new(a.coords());
        b.attach_entity(entity("pig", None));
        assert_eq!(a, b);
        assert_ne!(a, ProtoChunk::new(CCoords::new(0, 0)));
    }

    #[test]
    fn test_section_mask() {
        let chunk = test_chunk();
        assert_eq!(chunk.section_mask(), 1 << 0 | 1 << 9);
        assert!(ProtoChunk::new(CCoords::new(0, 0)).is_empty());
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_payload_roundtrip() {
        let registry = BlockRegistry::vanilla();
        let chunk = test_chunk();

        let mut bytes = Vec::new();
        chunk.write_payload(&mut bytes).unwrap();
        let mut reader = bytes.as_slice();
        let decoded = ProtoChunk::read_payload(&mut reader, chunk.coords(), &registry).unwrap();

        assert!(reader.is_empty());
        assert_eq!(decoded.height_map(), chunk.height_map());
        assert_eq!(decoded.biomes(), chunk.biomes());
        assert_eq!(decoded.section_mask(), chunk.section_mask());
        assert_eq!(
            decoded.section(9).unwrap().block(15, 15, 15),
            pack_block_id(35, 11)
        );
        assert!(decoded.section(1).is_none());
    }

    #[test]
    fn test_truncated_payload() {
        let chunk = test_chunk();
        let mut bytes = Vec::new();
        chunk.write_payload(&mut bytes).unwrap();
        bytes.truncate(100);

        let err = ProtoChunk::read_payload(
            &mut bytes.as_slice(),
            chunk.coords(),
            &BlockRegistry::vanilla(),
        )
        .unwrap_err();
        assert!(matches!(err, SlimeError::Truncated("chunk heightmap")));
    }

    #[derive(Default)]
    struct TestWorld;

    struct TestChunk {
        coords: CCoords,
        sections: usize,
        populated: bool,
        entities: Vec<String>,
        tiles: Vec<String>,
        mounts: Vec<(usize, usize)>,
    }

    impl EngineWorld for TestWorld {
        type Chunk = TestChunk;

        fn create_chunk(&mut self, coords: CCoords) -> TestChunk {
            TestChunk {
                coords,
                sections: 0,
                populated: false,
                entities: Vec::new(),
                tiles: Vec::new(),
                mounts: Vec::new(),
            }
        }
    }

    impl EngineChunk for TestChunk {
        type EntityId = usize;

        fn install_height_map(&mut self, _height_map: &[i32; HEIGHTMAP_SIZE]) {}

        fn install_biomes(&mut self, _biomes: &[u8; BIOME_ARRAY_SIZE]) {}

        fn install_sections(&mut self, sections: [Option<Section>; SECTIONS_PER_CHUNK]) {
            self.sections = sections.iter().flatten().count();
        }

        fn mark_populated(&mut self) {
            self.populated = true;
        }

        fn spawn_entity(&mut self, tag: &Value) -> Option<usize> {
            let name = match tag::get(tag, "id").ok()? {
                Value::String(name) => name.clone(),
                _ => return None,
            };
            if name == "missingno" {
                return None;
            }
            self.entities.push(name);
            Some(self.entities.len() - 1)
        }

        fn mount(&mut self, rider: usize, vehicle: usize) {
            self.mounts.push((rider, vehicle));
        }

        fn spawn_tile_entity(&mut self, tag: &Value) -> bool {
            match tag::get(tag, "id") {
                Ok(Value::String(name)) if name != "missingno" => {
                    self.tiles.push(name.clone());
                    true
                }
                _ => false,
            }
        }
    }

    #[test]
    fn test_materialize_installs_terrain() {
        let chunk = test_chunk();
        let live = chunk.materialize(&mut TestWorld);
        assert_eq!(live.coords, chunk.coords());
        assert_eq!(live.sections, 2);
        assert!(live.populated);
    }

    #[test]
    fn test_materialize_riding_chain() {
        let mut chunk = ProtoChunk::new(CCoords::new(0, 0));
        chunk.attach_entity(entity(
            "skeleton",
            Some(entity("spider", Some(entity("pig", None)))),
        ));

        let live = chunk.materialize(&mut TestWorld);
        assert_eq!(live.entities, vec!["skeleton", "spider", "pig"]);
        // skeleton rides spider, spider rides pig.
        assert_eq!(live.mounts, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_materialize_broken_riding_chain() {
        let mut chunk = ProtoChunk::new(CCoords::new(0, 0));
        chunk.attach_entity(entity(
            "skeleton",
            Some(entity("spider", Some(entity("missingno", None)))),
        ));
        chunk.attach_entity(entity("cow", None));

        let live = chunk.materialize(&mut TestWorld);
        // The chain stops at the unreconstructable mount, keeping what was
        // already mounted; later entities are unaffected.
        assert_eq!(live.entities, vec!["skeleton", "spider", "cow"]);
        assert_eq!(live.mounts, vec![(0, 1)]);
    }

    #[test]
    fn test_materialize_skips_bad_elements() {
        let mut chunk = ProtoChunk::new(CCoords::new(0, 0));
        chunk.attach_entity(entity("missingno", None));
        chunk.attach_entity(entity("creeper", None));
        chunk.attach_tile_entity(entity("missingno", None));
        chunk.attach_tile_entity(entity("Chest", None));

        let live = chunk.materialize(&mut TestWorld);
        assert_eq!(live.entities, vec!["creeper"]);
        assert_eq!(live.tiles, vec!["Chest"]);
    }
}
