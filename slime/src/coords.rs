/*
Slime format notes:

- The region presence bitmap is ordered by (Z, X): bit i addresses the chunk
  at (i % width + minX, i / width + minZ).
- A section's blocks are ordered by (Y, Z, X).
 */

/// Chunk-grid coordinates.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    derive_more::From,
    derive_more::Into,
    derive_more::Display,
    derive_more::Add,
    derive_more::Sub,
)]
#[display("<x={x} z={z}>")]
pub struct CCoords {
    pub x: i32,
    pub z: i32,
}

impl CCoords {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Coordinates of the chunk containing the given block position.
    pub const fn from_block_pos(x: i32, z: i32) -> Self {
        Self {
            x: x >> 4,
            z: z >> 4,
        }
    }

    /// Index of this chunk in a row-major presence bitmap anchored at
    /// `(min_x, min_z)`.
    pub fn to_bitmap_index(self, min_x: i32, min_z: i32, width: i32) -> usize {
        ((self.z - min_z) * width + (self.x - min_x)) as usize
    }

    pub fn from_bitmap_index(index: usize, min_x: i32, min_z: i32, width: i32) -> Self {
        Self {
            x: index as i32 % width + min_x,
            z: index as i32 / width + min_z,
        }
    }
}

/// Z-major ordering, matching the bitmap row order used on disk.
impl Ord for CCoords {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.z, self.x).cmp(&(other.z, other.x))
    }
}

impl PartialOrd for CCoords {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CCoords::new(3, -7)), "<x=3 z=-7>");
    }

    #[test]
    fn test_from_block_pos() {
        assert_eq!(CCoords::from_block_pos(0, 0), CCoords::new(0, 0));
        assert_eq!(CCoords::from_block_pos(15, 16), CCoords::new(0, 1));
        assert_eq!(CCoords::from_block_pos(-1, -16), CCoords::new(-1, -1));
        assert_eq!(CCoords::from_block_pos(-17, 31), CCoords::new(-2, 1));
    }

    #[test]
    fn test_bitmap_index_roundtrip() {
        let (min_x, min_z, width) = (-2, 5, 4);
        for index in 0..12 {
            let coords = CCoords::from_bitmap_index(index, min_x, min_z, width);
            assert_eq!(coords.to_bitmap_index(min_x, min_z, width), index);
        }
        assert_eq!(
            CCoords::from_bitmap_index(0, min_x, min_z, width),
            CCoords::new(-2, 5)
        );
        assert_eq!(
            CCoords::from_bitmap_index(5, min_x, min_z, width),
            CCoords::new(-1, 6)
        );
    }

    #[test]
    fn test_z_major_ordering() {
        let mut coords = vec![
            CCoords::new(1, 1),
            CCoords::new(0, 2),
            CCoords::new(2, 0),
            CCoords::new(0, 1),
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![
                CCoords::new(2, 0),
                CCoords::new(0, 1),
                CCoords::new(1, 1),
                CCoords::new(0, 2),
            ]
        );
    }
}
