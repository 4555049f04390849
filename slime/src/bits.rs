use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::SlimeError;

/// Fixed-layout bitset with the LSB-first byte order used by the slime
/// presence bitmaps: bit `i` lives in byte `i / 8` at bit position `i % 8`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BitSet {
    bytes: Vec<u8>,
}

impl BitSet {
    pub fn with_capacity(nbits: usize) -> Self {
        Self {
            bytes: vec![0; nbits.div_ceil(8)],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Reads beyond the stored length are unset, never an error.
    pub fn get(&self, index: usize) -> bool {
        match self.bytes.get(index / 8) {
            Some(byte) => byte >> (index % 8) & 1 == 1,
            None => false,
        }
    }

    pub fn set(&mut self, index: usize) {
        self.bytes[index / 8] |= 1 << (index % 8);
    }

    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Serialize to exactly `byte_count` bytes, zero-padding past the stored
    /// length. The caller must size `byte_count` to hold the highest set bit.
    pub fn to_fixed_bytes(&self, byte_count: usize) -> Vec<u8> {
        let mut bytes = self.bytes.clone();
        debug_assert!(
            bytes.iter().skip(byte_count).all(|&b| b == 0),
            "bitset does not fit in {} bytes",
            byte_count
        );
        bytes.resize(byte_count, 0);
        bytes
    }
}

pub(crate) fn read_exact(
    reader: &mut impl Read,
    buf: &mut [u8],
    what: &'static str,
) -> Result<(), SlimeError> {
    reader
        .read_exact(buf)
        .map_err(|err| SlimeError::from_read(err, what))
}

/// Read exactly `n` big-endian 32-bit integers.
pub(crate) fn read_i32_array(
    reader: &mut impl Read,
    n: usize,
    what: &'static str,
) -> Result<Vec<i32>, SlimeError> {
    let mut values = vec![0i32; n];
    reader
        .read_i32_into::<BigEndian>(&mut values)
        .map_err(|err| SlimeError::from_read(err, what))?;
    Ok(values)
}
