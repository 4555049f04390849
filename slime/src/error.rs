use crate::tag::TagError;

/// Errors raised while encoding or decoding a slime region. Structural errors
/// abort the whole operation; per-element failures (one entity, one legacy
/// block id) are logged and skipped instead of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum SlimeError {
    #[error("invalid magic header")]
    InvalidMagic,

    #[error("unsupported slime version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid bounds: width={width} depth={depth}")]
    InvalidBounds { width: i32, depth: i32 },

    #[error("truncated input while reading {0}")]
    Truncated(&'static str),

    #[error("frame declared {declared} uncompressed bytes, got {actual}")]
    FrameMismatch { declared: usize, actual: usize },

    #[error("zlib decompression failed: {0}")]
    Decompress(String),

    #[error("malformed tag payload: {0}")]
    Nbt(String),

    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SlimeError {
    /// Convert an I/O error from a read into the codec taxonomy: an exhausted
    /// source is a truncation, anything else passes through.
    pub(crate) fn from_read(err: std::io::Error, what: &'static str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            SlimeError::Truncated(what)
        } else {
            SlimeError::Io(err)
        }
    }
}
