//! Version-addressed replay extraction.
//!
//! Replay archives embed the build number that produced them, and every
//! section's binary layout depends on it. This crate is the orchestration
//! layer that ties the container and protocol crates together:
//!
//! - **Session cache**: [`ReplaySession`] keeps at most one archive open,
//!   keyed by canonicalized path, with per-section memoization
//! - **Header bootstrap**: the header is decoded with the oldest-known
//!   protocol just far enough to learn the build number, then re-decoded
//!   with the build-specific protocol
//! - **Classification**: each section name maps to whole-buffer decode,
//!   lazy record-stream decode, or pass-through ([`classify`])
//! - **Normalization**: decoded byte buffers become text recursively
//!   through nested structures ([`normalize`])
//! - **Filtering**: record streams can be extracted through a field-value
//!   whitelist with per-record short-circuiting ([`EventFilter`])
//!
//! # Example
//!
//! ```rust,no_run
//! use stormlens_replay::{EventFilter, ReplaySession, DETAILS, TRACKER_EVENTS};
//!
//! # fn main() -> Result<(), stormlens_replay::ReplayError> {
//! let mut session = ReplaySession::new();
//!
//! let details = session.extract(DETAILS, "replay.StormReplay")?;
//! let filter = EventFilter::new().field("m_playerId", [2i64]);
//! let events = session.extract_filtered(TRACKER_EVENTS, "replay.StormReplay", &filter)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod filter;
mod normalize;
mod section;
mod session;

pub use error::{ReplayError, ReplayResult};
pub use filter::EventFilter;
pub use normalize::normalize;
pub use section::{
    ATTRIBUTES_EVENTS, DETAILS, GAME_EVENTS, HEADER, INITDATA, MESSAGE_EVENTS, SECTIONS, Section,
    Strategy, TRACKER_EVENTS, classify,
};
pub use session::{Backend, ReplaySession, SectionData, parse_header, parse_section};

// The decoded-value model is part of this crate's public signatures.
pub use stormlens_protocol::DecodedValue;
