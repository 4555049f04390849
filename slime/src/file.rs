use std::collections::BTreeMap;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use derivative::Derivative; // TODO: replace with derive_more::Debug
use fastnbt::Value;
use flate2::Compression;

use crate::bits::{BitSet, read_exact};
use crate::chunk::ProtoChunk;
use crate::coords::CCoords;
use crate::error::SlimeError;
use crate::frame;
use crate::registry::BlockRegistry;
use crate::settings::Settings;
use crate::tag::{self, TagError};

pub const SLIME_MAGIC: u16 = 0xB10B;
pub const CURRENT_VERSION: u8 = 3;
const MIN_VERSION: u8 = 1;
const MAX_VERSION: u8 = 3;

/// Revisions 1 and 3 carry an entity-present flag and entity block.
pub const fn version_has_entities(version: u8) -> bool {
    matches!(version, 1 | 3)
}

fn fmt_byte_count<T>(v: &Vec<T>, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
    write!(f, "[.. {} bytes ..]", v.len())
}

/// Decoded whole-region container: header, bounds, presence bitmap and the
/// coordinate index of proto-chunks. Immutable once built; safe to share for
/// concurrent reads.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SlimeFile {
    version: u8,
    min_x: i16,
    min_z: i16,
    width: i16,
    depth: i16,
    populated: BitSet,
    #[derivative(Debug(format_with = "fmt_byte_count"))]
    chunk_data: Vec<u8>,
    proto_chunks: BTreeMap<CCoords, ProtoChunk>,
}

impl SlimeFile {
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Bounding rectangle as (minX, minZ, width, depth), in chunks.
    pub fn bounds(&self) -> (i16, i16, i16, i16) {
        (self.min_x, self.min_z, self.width, self.depth)
    }

    pub fn populated_chunks(&self) -> &BitSet {
        &self.populated
    }

    pub fn chunk_count(&self) -> usize {
        self.proto_chunks.len()
    }

    pub fn proto_chunk_at(&self, x: i32, z: i32) -> Option<&ProtoChunk> {
        self.proto_chunks.get(&CCoords::new(x, z))
    }

    /// Proto-chunks in Z-major coordinate order.
    pub fn chunks(&self) -> impl Iterator<Item = &ProtoChunk> {
        self.proto_chunks.values()
    }

    pub fn into_chunks(self) -> impl Iterator<Item = ProtoChunk> {
        self.proto_chunks.into_values()
    }
}

/// Explicit codec context: settings plus the block registry used to repair
/// legacy ids. Constructed by the caller and passed to every entry point.
#[derive(Clone, Debug)]
pub struct SlimeCodec {
    settings: Settings,
    registry: BlockRegistry,
}

impl SlimeCodec {
    pub fn new(settings: Settings, registry: BlockRegistry) -> Self {
        Self { settings, registry }
    }

    pub fn with_defaults() -> Self {
        Self::new(Settings::default(), BlockRegistry::vanilla())
    }

    /// Encode a region file from a set of chunks. Chunks with no populated
    /// section are dropped; the remainder is written in (Z, X) ascending
    /// order. An empty set produces the degenerate 1x1 bounds with an
    /// all-zero bitmap.
    pub fn encode_region<'a, I>(&self, chunks: I) -> Result<Vec<u8>, SlimeError>
    where
        I: IntoIterator<Item = &'a ProtoChunk>,
    {
        let version = self.settings.format.version;
        if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
            return Err(SlimeError::UnsupportedVersion(version));
        }
        let level = Compression::new(self.settings.compression.level);

        let mut chunks: Vec<&ProtoChunk> =
            chunks.into_iter().filter(|chunk| !chunk.is_empty()).collect();
        chunks.sort_by_key(|chunk| chunk.coords());
        log::debug!("encoding region of {} chunks", chunks.len());

        let min_x = chunks.iter().map(|c| c.coords().x).min().unwrap_or(1);
        let min_z = chunks.iter().map(|c| c.coords().z).min().unwrap_or(1);
        let max_x = chunks.iter().map(|c| c.coords().x).max().unwrap_or(1);
        let max_z = chunks.iter().map(|c| c.coords().z).max().unwrap_or(1);
        let width = max_x - min_x + 1;
        let depth = max_z - min_z + 1;
        let out_of_range = [min_x, min_z, width, depth]
            .iter()
            .any(|&v| i16::try_from(v).is_err());
        if out_of_range {
            return Err(SlimeError::InvalidBounds { width, depth });
        }

        let bit_count = (width * depth) as usize;
        let mut populated = BitSet::with_capacity(bit_count);
        for chunk in &chunks {
            populated.set(chunk.coords().to_bitmap_index(min_x, min_z, width));
        }

        let mut out = Vec::new();
        out.write_u16::<BigEndian>(SLIME_MAGIC)?;
        out.write_u8(version)?;
        out.write_i16::<BigEndian>(min_x as i16)?;
        out.write_i16::<BigEndian>(min_z as i16)?;
        out.write_i16::<BigEndian>(width as i16)?;
        out.write_i16::<BigEndian>(depth as i16)?;
        out.extend_from_slice(&populated.to_fixed_bytes(bit_count.div_ceil(8)));

        let mut payload = Vec::new();
        for chunk in &chunks {
            chunk.write_payload(&mut payload)?;
        }
        frame::write_compressed_block(&mut out, &payload, level)?;

        let tiles: Vec<Value> = chunks
            .iter()
            .flat_map(|chunk| chunk.tile_entities().iter().cloned())
            .collect();
        frame::write_compressed_block(&mut out, &tag::list_payload("tiles", &tiles)?, level)?;

        if version_has_entities(version) {
            let has_entities = self.settings.format.entities;
            out.write_u8(has_entities as u8)?;
            if has_entities {
                // The entity block is encoded from its own byte source, never
                // a copy of the chunk block.
                let entities: Vec<Value> = chunks
                    .iter()
                    .flat_map(|chunk| chunk.entities().iter().cloned())
                    .collect();
                frame::write_compressed_block(
                    &mut out,
                    &tag::list_payload("entities", &entities)?,
                    level,
                )?;
            }
        }

        // Reserved trailer; the read path skips it unconditionally.
        frame::write_compressed_block(&mut out, &tag::empty_payload()?, level)?;
        Ok(out)
    }

    /// Decode a whole region file. Structural errors abort with no partial
    /// result; entity and tile-entity tags whose owning chunk is absent are
    /// dropped with a warning.
    pub fn decode_region(&self, bytes: &[u8]) -> Result<SlimeFile, SlimeError> {
        let mut reader = bytes;

        let magic = reader
            .read_u16::<BigEndian>()
            .map_err(|err| SlimeError::from_read(err, "magic header"))?;
        if magic != SLIME_MAGIC {
            return Err(SlimeError::InvalidMagic);
        }
        let version = reader
            .read_u8()
            .map_err(|err| SlimeError::from_read(err, "version"))?;
        if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
            return Err(SlimeError::UnsupportedVersion(version));
        }

        let min_x = reader
            .read_i16::<BigEndian>()
            .map_err(|err| SlimeError::from_read(err, "min x"))?;
        let min_z = reader
            .read_i16::<BigEndian>()
            .map_err(|err| SlimeError::from_read(err, "min z"))?;
        let width = reader
            .read_i16::<BigEndian>()
            .map_err(|err| SlimeError::from_read(err, "width"))?;
        let depth = reader
            .read_i16::<BigEndian>()
            .map_err(|err| SlimeError::from_read(err, "depth"))?;
        if width < 1 || depth < 1 {
            return Err(SlimeError::InvalidBounds {
                width: width as i32,
                depth: depth as i32,
            });
        }

        let bit_count = width as usize * depth as usize;
        let mut bitmap_bytes = vec![0u8; bit_count.div_ceil(8)];
        read_exact(&mut reader, &mut bitmap_bytes, "presence bitmap")?;
        let populated = BitSet::from_bytes(&bitmap_bytes);

        let chunk_data = frame::read_compressed_block(&mut reader)?;
        let tile_data = frame::read_compressed_block(&mut reader)?;
        let entity_tags = if version_has_entities(version) {
            let has_entities = reader
                .read_u8()
                .map_err(|err| SlimeError::from_read(err, "entity flag"))?
                != 0;
            if has_entities {
                let entity_data = frame::read_compressed_block(&mut reader)?;
                tag::parse_list_payload(&entity_data, "entities")?
            } else {
                Vec::new()
            }
        } else {
            Vec::new()
        };
        frame::skip_compressed_block(&mut reader)?;

        let tile_tags = tag::parse_list_payload(&tile_data, "tiles")?;

        let mut proto_chunks = BTreeMap::new();
        let mut chunk_reader = chunk_data.as_slice();
        for index in 0..bit_count {
            if !populated.get(index) {
                continue;
            }
            let coords =
                CCoords::from_bitmap_index(index, min_x as i32, min_z as i32, width as i32);
            let chunk = ProtoChunk::read_payload(&mut chunk_reader, coords, &self.registry)?;
            proto_chunks.insert(coords, chunk);
        }
        log::debug!(
            "decoded {} chunks, {} tile entities, {} entities",
            proto_chunks.len(),
            tile_tags.len(),
            entity_tags.len()
        );

        for tag in entity_tags {
            match entity_owner(&tag) {
                Ok(coords) => match proto_chunks.get_mut(&coords) {
                    Some(chunk) => chunk.attach_entity(tag),
                    None => log::warn!("dropping entity for unpopulated chunk {}", coords),
                },
                Err(err) => log::warn!("dropping entity with bad position: {}", err),
            }
        }
        for tag in tile_tags {
            match tile_owner(&tag) {
                Ok(coords) => match proto_chunks.get_mut(&coords) {
                    Some(chunk) => chunk.attach_tile_entity(tag),
                    None => log::warn!("dropping tile entity for unpopulated chunk {}", coords),
                },
                Err(err) => log::warn!("dropping tile entity with bad position: {}", err),
            }
        }

        Ok(SlimeFile {
            version,
            min_x,
            min_z,
            width,
            depth,
            populated,
            chunk_data,
            proto_chunks,
        })
    }
}

/// Owning chunk of an entity tag, from its "Pos" double list.
fn entity_owner(tag: &Value) -> Result<CCoords, TagError> {
    let pos = tag::get_list(tag, "Pos")?;
    let x = tag::double_at(pos, 0)?;
    let z = tag::double_at(pos, 2)?;
    Ok(CCoords::from_block_pos(x.floor() as i32, z.floor() as i32))
}

/// Owning chunk of a tile-entity tag, from its int position keys.
fn tile_owner(tag: &Value) -> Result<CCoords, TagError> {
    Ok(CCoords::from_block_pos(
        tag::get_int(tag, "x")?,
        tag::get_int(tag, "z")?,
    ))
}
