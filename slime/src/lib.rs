//! Codec for the Slime voxel-region format: a compact, zlib-compressed
//! binary layout for a rectangle of chunks plus their entities and tile
//! entities.
//!
//! [`SlimeCodec`] is the entry point. It holds the [`Settings`] and the
//! [`BlockRegistry`](registry::BlockRegistry) used to repair legacy block
//! states, and exposes [`encode_region`](SlimeCodec::encode_region) and
//! [`decode_region`](SlimeCodec::decode_region). Decoding produces a
//! [`SlimeFile`] of engine-independent [`ProtoChunk`]s, which can then be
//! [materialized](chunk::ProtoChunk::materialize) into a hosting engine via
//! the [`engine`] traits.

pub mod bits;
pub mod chunk;
pub mod coords;
pub mod engine;
pub mod error;
pub mod file;
pub mod frame;
pub mod registry;
pub mod section;
pub mod settings;
pub mod tag;

pub use chunk::ProtoChunk;
pub use coords::CCoords;
pub use error::SlimeError;
pub use file::{SlimeCodec, SlimeFile};
pub use settings::Settings;
