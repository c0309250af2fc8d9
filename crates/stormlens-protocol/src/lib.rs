//! Versioned replay protocol schemas and decoders.
//!
//! Replay sections are encoded against a schema that changes with the
//! game's build number. This crate holds the decoding machinery shared by
//! every build plus the per-build schema tables, and resolves build
//! numbers to decoder implementations:
//!
//! - **Value model**: [`DecodedValue`], a tagged tree of structs, arrays,
//!   scalars and byte buffers — no fixed record layout is imposed
//! - **Decoder machines**: [`VersionedDecoder`] for the tag-prefixed
//!   self-describing format, [`BitPackedDecoder`] for the raw bit-packed
//!   format, both driven by static [`TypeInfo`] tables
//! - **Decode contract**: the [`ReplayProtocol`] trait, one decode
//!   operation per replay section, with lazy [`EventStream`]s for the
//!   event sections
//! - **Registry**: [`resolve`] for exact build-number lookup and
//!   [`bootstrap`] for reading the build number out of a header before
//!   the real protocol is known
//!
//! # Example
//!
//! ```rust
//! use stormlens_protocol::{bootstrap, resolve};
//!
//! // The bootstrap protocol reads any header far enough to learn the
//! // build number; the resolved protocol decodes everything else.
//! assert_eq!(bootstrap().build(), 29406);
//! assert!(resolve(66488).is_ok());
//! assert!(resolve(1).is_err());
//! ```

#![warn(missing_docs)]

mod bitpacked;
mod buffer;
pub mod builds;
mod error;
mod registry;
mod schema;
mod typeinfo;
mod value;
mod versioned;

pub use bitpacked::BitPackedDecoder;
pub use buffer::{BitOrder, BitPackedBuffer};
pub use error::{ProtocolError, ProtocolResult};
pub use registry::{KNOWN_BUILDS, bootstrap, resolve};
pub use schema::{EventStream, EventType, ProtocolSchema, ReplayProtocol, SchemaProtocol};
pub use typeinfo::{Bounds, Field, TypeInfo, Variant};
pub use value::DecodedValue;
pub use versioned::VersionedDecoder;
