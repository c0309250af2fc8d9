//! Error types for replay extraction

use std::path::PathBuf;
use stormlens_mpq::MpqError;
use stormlens_protocol::ProtocolError;
use thiserror::Error;

/// Extraction result type
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Error types for replay extraction.
///
/// Errors are per call: a failed decode of one section leaves the session
/// usable for every other section of the same archive. Nothing is
/// retried — replay bytes are static, so a retry cannot change the
/// outcome.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The container could not be opened or identified
    #[error("failed to open archive {path}: {source}")]
    ArchiveOpen {
        /// Archive path as given by the caller
        path: PathBuf,
        /// Container-level cause
        source: MpqError,
    },

    /// No protocol schema is registered for the archive's build number
    #[error("unsupported protocol build {0}")]
    UnsupportedBuild(u32),

    /// The container reported failure reading a named section.
    ///
    /// Never returned from extraction: it is logged as a warning and the
    /// section is treated as empty, so one corrupt section cannot abort
    /// extraction of the others.
    #[error("failed to read section {section}: {source}")]
    SectionRead {
        /// Section name
        section: String,
        /// Container-level cause
        source: MpqError,
    },

    /// Section bytes do not match the build's schema
    #[error("failed to decode {section}: {source}")]
    Decode {
        /// Section name
        section: String,
        /// Decoder-level cause
        source: ProtocolError,
    },
}
