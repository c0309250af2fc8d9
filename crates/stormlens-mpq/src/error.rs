//! Error types for container operations

use thiserror::Error;

/// Container operation result type
pub type MpqResult<T> = Result<T, MpqError>;

/// Error types for MPQ container operations
#[derive(Debug, Error)]
pub enum MpqError {
    /// File does not start with a known MPQ magic
    #[error("invalid archive magic: {0:02x?}")]
    InvalidMagic([u8; 4]),

    /// Archive has no user-data block, so it cannot be a replay
    #[error("archive has no user-data block")]
    NotAReplay,

    /// Named file absent from the archive
    #[error("file not found in archive: {0}")]
    FileNotFound(String),

    /// Block is flagged encrypted; replay sections never are
    #[error("encrypted file not supported: {0}")]
    EncryptionUnsupported(String),

    /// Sector uses a compression scheme other than zlib
    #[error("unsupported compression type: {0:#04x}")]
    UnsupportedCompression(u8),

    /// Structurally invalid container data
    #[error("corrupted archive: {reason}")]
    Corrupted {
        /// Detailed description of the inconsistency
        reason: String,
    },

    /// Binary read/write error
    #[error("binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
