use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use derivative::Derivative; // TODO: replace with derive_more::Debug

use crate::bits::read_exact;
use crate::error::SlimeError;
use crate::registry::{BlockRegistry, block_kind};

pub const CHUNK_SIZE: u32 = 16;
pub const SECTION_BLOCK_COUNT: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;
pub const NIBBLE_ARRAY_SIZE: usize = SECTION_BLOCK_COUNT / 2;

/// Flat index of a block within a section.
#[inline]
pub fn block_index(x: usize, y: usize, z: usize) -> usize {
    y << 8 | z << 4 | x
}

/// Packed array of 4-bit values, two per byte; even indexes occupy the low
/// nibble.
#[derive(Clone, Eq, PartialEq)]
pub struct NibbleArray {
    data: Box<[u8; NIBBLE_ARRAY_SIZE]>,
}

impl NibbleArray {
    pub fn new() -> Self {
        Self {
            data: Box::new([0; NIBBLE_ARRAY_SIZE]),
        }
    }

    pub fn from_bytes(data: Box<[u8; NIBBLE_ARRAY_SIZE]>) -> Self {
        Self { data }
    }

    pub fn get(&self, index: usize) -> u8 {
        let byte = self.data[index >> 1];
        if index & 1 == 0 { byte & 0xF } else { byte >> 4 }
    }

    pub fn set(&mut self, index: usize, value: u8) {
        let byte = &mut self.data[index >> 1];
        if index & 1 == 0 {
            *byte = *byte & 0xF0 | value & 0xF;
        } else {
            *byte = *byte & 0x0F | (value & 0xF) << 4;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }
}

impl Default for NibbleArray {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NibbleArray {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "NibbleArray[.. {} bytes ..]", self.data.len())
    }
}

/// One 16x16x16 vertical slice of a chunk. Block ids are packed
/// `kind << 4 | data`, indexed `(y << 8) | (z << 4) | x`.
#[derive(Clone, Derivative, Eq, PartialEq)]
#[derivative(Debug)]
pub struct Section {
    y_base: i32,
    #[derivative(Debug = "ignore")]
    block_ids: Box<[u16; SECTION_BLOCK_COUNT]>,
    emitted_light: NibbleArray,
    sky_light: NibbleArray,
    /// Cached count of non-air blocks, kept for the engine collaborator.
    non_air: u32,
}

impl Section {
    pub fn new(section_index: usize) -> Self {
        Self {
            y_base: section_index as i32 * CHUNK_SIZE as i32,
            block_ids: Box::new([0; SECTION_BLOCK_COUNT]),
            emitted_light: NibbleArray::new(),
            sky_light: NibbleArray::new(),
            non_air: 0,
        }
    }

    pub fn y_base(&self) -> i32 {
        self.y_base
    }

    pub fn block(&self, x: usize, y: usize, z: usize) -> u16 {
        self.block_ids[block_index(x, y, z)]
    }

    pub fn set_block(&mut self, x: usize, y: usize, z: usize, id: u16) {
        let index = block_index(x, y, z);
        let old = self.block_ids[index];
        self.non_air = self.non_air + (block_kind(id) != 0) as u32
            - (block_kind(old) != 0) as u32;
        self.block_ids[index] = id;
    }

    pub fn block_ids(&self) -> &[u16; SECTION_BLOCK_COUNT] {
        &self.block_ids
    }

    pub fn emitted_light(&self) -> &NibbleArray {
        &self.emitted_light
    }

    pub fn emitted_light_mut(&mut self) -> &mut NibbleArray {
        &mut self.emitted_light
    }

    pub fn sky_light(&self) -> &NibbleArray {
        &self.sky_light
    }

    pub fn sky_light_mut(&mut self) -> &mut NibbleArray {
        &mut self.sky_light
    }

    pub fn non_air_blocks(&self) -> u32 {
        self.non_air
    }

    fn recount(&mut self) {
        self.non_air = self
            .block_ids
            .iter()
            .filter(|&&id| block_kind(id) != 0)
            .count() as u32;
    }

    /// Encode one populated section: emitted light, 4096 block-kind bytes,
    /// sub-data nibbles, sky light, then the reserved extra-data length
    /// (always zero on encode).
    pub(crate) fn encode(&self, writer: &mut impl Write) -> Result<(), SlimeError> {
        writer.write_all(self.emitted_light.as_bytes())?;

        let mut kinds = [0u8; SECTION_BLOCK_COUNT];
        let mut data = NibbleArray::new();
        for (index, &id) in self.block_ids.iter().enumerate() {
            kinds[index] = (id >> 4) as u8;
            data.set(index, (id & 0xF) as u8);
        }
        writer.write_all(&kinds)?;
        writer.write_all(data.as_bytes())?;

        writer.write_all(self.sky_light.as_bytes())?;
        writer.write_u16::<BigEndian>(0)?;
        Ok(())
    }

    /// Decode one populated section, resolving each stored (kind, sub-data)
    /// pair through the block registry and skipping the reserved extra-data
    /// field. Recomputes the cached non-air count.
    pub(crate) fn decode(
        reader: &mut impl Read,
        section_index: usize,
        registry: &BlockRegistry,
    ) -> Result<Self, SlimeError> {
        let mut emitted_light = Box::new([0u8; NIBBLE_ARRAY_SIZE]);
        read_exact(reader, &mut emitted_light[..], "section emitted light")?;

        let mut kinds = vec![0u8; SECTION_BLOCK_COUNT];
        read_exact(reader, &mut kinds, "section block kinds")?;
        let mut data = Box::new([0u8; NIBBLE_ARRAY_SIZE]);
        read_exact(reader, &mut data[..], "section block data")?;
        let data = NibbleArray::from_bytes(data);

        let mut block_ids = Box::new([0u16; SECTION_BLOCK_COUNT]);
        for index in 0..SECTION_BLOCK_COUNT {
            block_ids[index] = registry.resolve(kinds[index], data.get(index));
        }

        let mut sky_light = Box::new([0u8; NIBBLE_ARRAY_SIZE]);
        read_exact(reader, &mut sky_light[..], "section sky light")?;

        // Reserved for forward compatibility; content discarded.
        let extra_len = reader
            .read_u16::<BigEndian>()
            .map_err(|err| SlimeError::from_read(err, "section extra data length"))?;
        if extra_len > 0 {
            let mut extra = vec![0u8; extra_len as usize];
            read_exact(reader, &mut extra, "section extra data")?;
        }

        let mut section = Self {
            y_base: section_index as i32 * CHUNK_SIZE as i32,
            block_ids,
            emitted_light: NibbleArray::from_bytes(emitted_light),
            sky_light: NibbleArray::from_bytes(sky_light),
            non_air: 0,
        };
        section.recount();
        Ok(section)
    }
}
