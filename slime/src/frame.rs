use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::Compression;

use crate::bits::read_exact;
use crate::error::SlimeError;

/// Write one length-prefixed compressed frame:
/// `[i32 compressed_len][i32 uncompressed_len][compressed bytes]`.
///
/// Compression is single-shot whole-block zlib; no streaming.
pub fn write_compressed_block(
    writer: &mut impl Write,
    raw: &[u8],
    level: Compression,
) -> Result<(), SlimeError> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), level);
    encoder.write_all(raw)?;
    let compressed = encoder.finish()?;

    writer.write_i32::<BigEndian>(compressed.len() as i32)?;
    writer.write_i32::<BigEndian>(raw.len() as i32)?;
    writer.write_all(&compressed)?;
    Ok(())
}

/// Read one frame and decompress it, validating the declared uncompressed
/// length. A length mismatch signals corruption and aborts the read.
pub fn read_compressed_block(reader: &mut impl Read) -> Result<Vec<u8>, SlimeError> {
    let compressed_len = reader
        .read_i32::<BigEndian>()
        .map_err(|err| SlimeError::from_read(err, "frame compressed length"))?;
    let uncompressed_len = reader
        .read_i32::<BigEndian>()
        .map_err(|err| SlimeError::from_read(err, "frame uncompressed length"))?;
    if compressed_len < 0 || uncompressed_len < 0 {
        return Err(SlimeError::Decompress(format!(
            "negative frame length ({} compressed, {} uncompressed)",
            compressed_len, uncompressed_len
        )));
    }

    let mut compressed = vec![0u8; compressed_len as usize];
    read_exact(reader, &mut compressed, "frame payload")?;

    let mut decoder = flate2::write::ZlibDecoder::new(Vec::with_capacity(uncompressed_len as usize));
    io::copy(&mut compressed.as_slice(), &mut decoder)
        .map_err(|err| SlimeError::Decompress(err.to_string()))?;
    let raw = decoder
        .finish()
        .map_err(|err| SlimeError::Decompress(err.to_string()))?;

    if raw.len() != uncompressed_len as usize {
        return Err(SlimeError::FrameMismatch {
            declared: uncompressed_len as usize,
            actual: raw.len(),
        });
    }
    Ok(raw)
}

/// Advance past one frame without decompressing it, using only the
/// `compressed_len` field plus the 4-byte width of `uncompressed_len`.
pub fn skip_compressed_block(reader: &mut impl Read) -> Result<(), SlimeError> {
    let compressed_len = reader
        .read_i32::<BigEndian>()
        .map_err(|err| SlimeError::from_read(err, "frame compressed length"))?;
    if compressed_len < 0 {
        return Err(SlimeError::Decompress(format!(
            "negative frame length ({} compressed)",
            compressed_len
        )));
    }
    let to_skip = 4 + compressed_len as u64;
    let skipped = io::copy(&mut reader.take(to_skip), &mut io::sink())?;
    if skipped != to_skip {
        return Err(SlimeError::Truncated("skipped frame"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let raw: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut frame = Vec::new();
        write_compressed_block(&mut frame, &raw, Compression::default()).unwrap();

        let decoded = read_compressed_block(&mut frame.as_slice()).unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn test_empty_block() {
        let mut frame = Vec::new();
        write_compressed_block(&mut frame, &[], Compression::default()).unwrap();
        let decoded = read_compressed_block(&mut frame.as_slice()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_declared_length_mismatch() {
        let mut frame = Vec::new();
        write_compressed_block(&mut frame, b"slime", Compression::default()).unwrap();
        // Tamper with the declared uncompressed length.
        frame[7] += 1;

        let err = read_compressed_block(&mut frame.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            SlimeError::FrameMismatch {
                declared: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let mut frame = Vec::new();
        write_compressed_block(&mut frame, b"slime", Compression::default()).unwrap();
        frame.truncate(frame.len() - 2);

        let err = read_compressed_block(&mut frame.as_slice()).unwrap_err();
        assert!(matches!(err, SlimeError::Truncated("frame payload")));
    }

    #[test]
    fn test_skip_advances_past_frame() {
        let mut bytes = Vec::new();
        write_compressed_block(&mut bytes, b"discard me", Compression::default()).unwrap();
        bytes.extend_from_slice(b"tail");

        let mut reader = bytes.as_slice();
        skip_compressed_block(&mut reader).unwrap();
        assert_eq!(reader, b"tail");
    }

    #[test]
    fn test_skip_truncated() {
        let mut bytes = Vec::new();
        write_compressed_block(&mut bytes, b"discard me", Compression::default()).unwrap();
        bytes.truncate(bytes.len() - 1);

        let err = skip_compressed_block(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, SlimeError::Truncated(_)));
    }
}
