//! Per-build schemas and the decode contract.
//!
//! A [`ProtocolSchema`] bundles everything build-specific: the type table
//! plus the entry-point type ids and event tables. [`SchemaProtocol`] is
//! the single [`ReplayProtocol`] implementation; schemas are data, the
//! decode logic is shared.

use crate::bitpacked::BitPackedDecoder;
use crate::buffer::{BitOrder, BitPackedBuffer};
use crate::error::{ProtocolError, ProtocolResult};
use crate::typeinfo::TypeInfo;
use crate::value::DecodedValue;
use crate::versioned::VersionedDecoder;
use std::collections::BTreeMap;

/// One entry of an event table: wire id, payload type, event name.
#[derive(Debug, Clone, Copy)]
pub struct EventType {
    /// Identifier as stored in the stream
    pub eventid: i64,
    /// Payload type index
    pub typeid: usize,
    /// Fully qualified event name, attached as `_event`
    pub name: &'static str,
}

impl EventType {
    /// Shorthand constructor used by the build tables.
    pub const fn new(eventid: i64, typeid: usize, name: &'static str) -> Self {
        Self {
            eventid,
            typeid,
            name,
        }
    }
}

/// Complete decoding description of one protocol build.
#[derive(Debug)]
pub struct ProtocolSchema {
    /// Build number this schema decodes
    pub build: u32,
    /// Type table; entries reference each other by index
    pub typeinfos: &'static [TypeInfo],
    /// Replay header root type
    pub header_typeid: usize,
    /// `replay.details` root type
    pub details_typeid: usize,
    /// `replay.initdata` root type
    pub initdata_typeid: usize,
    /// Game event table
    pub game_event_types: &'static [EventType],
    /// Type of the game event identifier
    pub game_eventid_typeid: usize,
    /// Message event table
    pub message_event_types: &'static [EventType],
    /// Type of the message event identifier
    pub message_eventid_typeid: usize,
    /// Tracker event table
    pub tracker_event_types: &'static [EventType],
    /// Type of the tracker event identifier
    pub tracker_eventid_typeid: usize,
    /// Variable-width gameloop delta (choice over integer widths)
    pub gameloop_delta_typeid: usize,
    /// Per-event user id structure
    pub userid_typeid: usize,
}

/// The decode contract every protocol build satisfies.
///
/// One decode operation per section: whole-buffer decodes return a single
/// tree; event sections return a lazy, ordered, non-restartable stream.
pub trait ReplayProtocol: Send + Sync + std::fmt::Debug {
    /// Build number this implementation decodes.
    fn build(&self) -> u32;

    /// Decodes the replay header (user-data content).
    fn decode_header(&self, contents: &[u8]) -> ProtocolResult<DecodedValue>;

    /// Decodes `replay.details`.
    fn decode_details(&self, contents: &[u8]) -> ProtocolResult<DecodedValue>;

    /// Decodes `replay.initdata`.
    fn decode_initdata(&self, contents: &[u8]) -> ProtocolResult<DecodedValue>;

    /// Decodes `replay.attributes.events`.
    fn decode_attributes_events(&self, contents: &[u8]) -> ProtocolResult<DecodedValue>;

    /// Lazily decodes the `replay.game.events` stream.
    fn decode_game_events<'a>(&self, contents: &'a [u8]) -> EventStream<'a>;

    /// Lazily decodes the `replay.message.events` stream.
    fn decode_message_events<'a>(&self, contents: &'a [u8]) -> EventStream<'a>;

    /// Lazily decodes the `replay.tracker.events` stream.
    fn decode_tracker_events<'a>(&self, contents: &'a [u8]) -> EventStream<'a>;
}

/// Schema-driven implementation of the decode contract.
#[derive(Debug)]
pub struct SchemaProtocol {
    /// The build description this instance decodes with
    pub schema: &'static ProtocolSchema,
}

impl ReplayProtocol for SchemaProtocol {
    fn build(&self) -> u32 {
        self.schema.build
    }

    fn decode_header(&self, contents: &[u8]) -> ProtocolResult<DecodedValue> {
        VersionedDecoder::new(contents, self.schema.typeinfos).instance(self.schema.header_typeid)
    }

    fn decode_details(&self, contents: &[u8]) -> ProtocolResult<DecodedValue> {
        VersionedDecoder::new(contents, self.schema.typeinfos).instance(self.schema.details_typeid)
    }

    fn decode_initdata(&self, contents: &[u8]) -> ProtocolResult<DecodedValue> {
        BitPackedDecoder::new(contents, self.schema.typeinfos).instance(self.schema.initdata_typeid)
    }

    fn decode_attributes_events(&self, contents: &[u8]) -> ProtocolResult<DecodedValue> {
        decode_attributes(contents)
    }

    fn decode_game_events<'a>(&self, contents: &'a [u8]) -> EventStream<'a> {
        EventStream {
            decoder: AnyDecoder::BitPacked(BitPackedDecoder::new(contents, self.schema.typeinfos)),
            schema: self.schema,
            event_types: self.schema.game_event_types,
            eventid_typeid: self.schema.game_eventid_typeid,
            decode_userid: true,
            stream: "game",
            gameloop: 0,
            failed: false,
        }
    }

    fn decode_message_events<'a>(&self, contents: &'a [u8]) -> EventStream<'a> {
        EventStream {
            decoder: AnyDecoder::BitPacked(BitPackedDecoder::new(contents, self.schema.typeinfos)),
            schema: self.schema,
            event_types: self.schema.message_event_types,
            eventid_typeid: self.schema.message_eventid_typeid,
            decode_userid: true,
            stream: "message",
            gameloop: 0,
            failed: false,
        }
    }

    fn decode_tracker_events<'a>(&self, contents: &'a [u8]) -> EventStream<'a> {
        EventStream {
            decoder: AnyDecoder::Versioned(VersionedDecoder::new(contents, self.schema.typeinfos)),
            schema: self.schema,
            event_types: self.schema.tracker_event_types,
            eventid_typeid: self.schema.tracker_eventid_typeid,
            decode_userid: false,
            stream: "tracker",
            gameloop: 0,
            failed: false,
        }
    }
}

enum AnyDecoder<'a> {
    Versioned(VersionedDecoder<'a>),
    BitPacked(BitPackedDecoder<'a>),
}

impl AnyDecoder<'_> {
    fn instance(&mut self, typeid: usize) -> ProtocolResult<DecodedValue> {
        match self {
            Self::Versioned(decoder) => decoder.instance(typeid),
            Self::BitPacked(decoder) => decoder.instance(typeid),
        }
    }

    fn done(&self) -> bool {
        match self {
            Self::Versioned(decoder) => decoder.done(),
            Self::BitPacked(decoder) => decoder.done(),
        }
    }

    fn byte_align(&mut self) {
        match self {
            Self::Versioned(decoder) => decoder.byte_align(),
            Self::BitPacked(decoder) => decoder.byte_align(),
        }
    }
}

/// Lazy, ordered event-record stream.
///
/// Records are produced one at a time in on-disk order; gameloop deltas
/// accumulate, so `_gameloop` values are non-decreasing. The stream is
/// fused: after the first decode error it yields nothing further.
pub struct EventStream<'a> {
    decoder: AnyDecoder<'a>,
    schema: &'static ProtocolSchema,
    event_types: &'static [EventType],
    eventid_typeid: usize,
    decode_userid: bool,
    stream: &'static str,
    gameloop: i64,
    failed: bool,
}

impl EventStream<'_> {
    fn decode_event(&mut self) -> ProtocolResult<DecodedValue> {
        let delta = varuint_value(
            &self
                .decoder
                .instance(self.schema.gameloop_delta_typeid)?,
        )?;
        self.gameloop += delta;

        let userid = if self.decode_userid {
            Some(self.decoder.instance(self.schema.userid_typeid)?)
        } else {
            None
        };

        let event_id = self
            .decoder
            .instance(self.eventid_typeid)?
            .as_i64()
            .ok_or_else(|| ProtocolError::InvalidData("event id is not an integer".to_owned()))?;
        let event_type = self
            .event_types
            .iter()
            .find(|entry| entry.eventid == event_id)
            .ok_or(ProtocolError::UnknownEventId {
                event_id,
                stream: self.stream,
            })?;

        let mut fields = match self.decoder.instance(event_type.typeid)? {
            DecodedValue::Struct(fields) => fields,
            other => {
                let mut fields = BTreeMap::new();
                fields.insert("_data".to_owned(), other);
                fields
            }
        };
        fields.insert(
            "_event".to_owned(),
            DecodedValue::Text(event_type.name.to_owned()),
        );
        fields.insert("_eventid".to_owned(), DecodedValue::Int(event_id));
        fields.insert("_gameloop".to_owned(), DecodedValue::Int(self.gameloop));
        if let Some(userid) = userid {
            fields.insert("_userid".to_owned(), userid);
        }

        // Events are byte-aligned on disk regardless of payload width.
        self.decoder.byte_align();
        Ok(DecodedValue::Struct(fields))
    }
}

impl Iterator for EventStream<'_> {
    type Item = ProtocolResult<DecodedValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.decoder.done() {
            return None;
        }
        let result = self.decode_event();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Extracts the integer out of a variable-width delta value.
///
/// The delta decodes as a single-variant wrapper struct (choice over
/// integer widths); plain integers are accepted too.
fn varuint_value(value: &DecodedValue) -> ProtocolResult<i64> {
    match value {
        DecodedValue::Int(value) => Ok(*value),
        DecodedValue::Struct(fields) if fields.len() == 1 => fields
            .values()
            .next()
            .and_then(DecodedValue::as_i64)
            .ok_or_else(|| {
                ProtocolError::InvalidData("delta wrapper does not hold an integer".to_owned())
            }),
        _ => Err(ProtocolError::InvalidData(
            "gameloop delta has an unexpected shape".to_owned(),
        )),
    }
}

/// Decodes the attributes section.
///
/// The section has a fixed little-endian layout rather than a type table:
/// a source byte, the map namespace, an entry count, then one record per
/// attribute with a four-byte reversed value.
fn decode_attributes(contents: &[u8]) -> ProtocolResult<DecodedValue> {
    let mut buffer = BitPackedBuffer::with_order(contents, BitOrder::LittleEndian);
    let mut root = BTreeMap::new();
    if buffer.done() {
        return Ok(DecodedValue::Struct(root));
    }

    root.insert(
        "source".to_owned(),
        DecodedValue::Int(buffer.read_bits(8)? as i64),
    );
    root.insert(
        "mapNamespace".to_owned(),
        DecodedValue::Int(buffer.read_bits(32)? as i64),
    );
    // Entry count; the stream is read to exhaustion instead.
    let _count = buffer.read_bits(32)?;

    let mut scopes: BTreeMap<String, BTreeMap<String, Vec<DecodedValue>>> = BTreeMap::new();
    while !buffer.done() {
        let namespace = buffer.read_bits(32)? as i64;
        let attrid = buffer.read_bits(32)? as i64;
        let scope = buffer.read_bits(8)? as i64;
        let mut value = buffer.read_aligned_bytes(4)?.to_vec();
        value.reverse();
        // Values are reversed four-character codes, null-padded.
        while value.last() == Some(&0) {
            value.pop();
        }
        while value.first() == Some(&0) {
            value.remove(0);
        }

        let mut record = BTreeMap::new();
        record.insert("namespace".to_owned(), DecodedValue::Int(namespace));
        record.insert("attrid".to_owned(), DecodedValue::Int(attrid));
        record.insert("value".to_owned(), DecodedValue::Bytes(value));

        scopes
            .entry(scope.to_string())
            .or_default()
            .entry(attrid.to_string())
            .or_default()
            .push(DecodedValue::Struct(record));
    }

    let scopes = scopes
        .into_iter()
        .map(|(scope, attrs)| {
            let attrs = attrs
                .into_iter()
                .map(|(attrid, records)| (attrid, DecodedValue::Array(records)))
                .collect();
            (scope, DecodedValue::Struct(attrs))
        })
        .collect();
    root.insert("scopes".to_owned(), DecodedValue::Struct(scopes));

    Ok(DecodedValue::Struct(root))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attribute_record(namespace: u32, attrid: u32, scope: u8, value: &[u8; 4]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&namespace.to_le_bytes());
        out.extend_from_slice(&attrid.to_le_bytes());
        out.push(scope);
        out.extend_from_slice(value);
        out
    }

    #[test]
    fn attributes_group_by_scope_and_id() {
        let mut contents = Vec::new();
        contents.push(2); // source
        contents.extend_from_slice(&999u32.to_le_bytes()); // mapNamespace
        contents.extend_from_slice(&2u32.to_le_bytes()); // count
        contents.extend_from_slice(&attribute_record(999, 3001, 16, b"\0muH"));
        contents.extend_from_slice(&attribute_record(999, 3001, 1, b"\0\0\0T"));

        let decoded = decode_attributes(&contents).unwrap();
        assert_eq!(
            decoded.get("source").and_then(DecodedValue::as_i64),
            Some(2)
        );
        assert_eq!(
            decoded.get("mapNamespace").and_then(DecodedValue::as_i64),
            Some(999)
        );

        // Stored four-byte values are reversed on decode.
        let records = decoded
            .get("scopes.16.3001")
            .and_then(DecodedValue::as_array)
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].field("value").unwrap(),
            &DecodedValue::Bytes(b"Hum".to_vec())
        );
    }

    #[test]
    fn empty_attributes_section_decodes_to_empty_struct() {
        let decoded = decode_attributes(&[]).unwrap();
        assert_eq!(decoded, DecodedValue::Struct(BTreeMap::new()));
    }

    #[test]
    fn varuint_unwraps_single_variant_struct() {
        let mut wrapper = BTreeMap::new();
        wrapper.insert("m_uint6".to_owned(), DecodedValue::Int(12));
        assert_eq!(varuint_value(&DecodedValue::Struct(wrapper)).unwrap(), 12);
        assert_eq!(varuint_value(&DecodedValue::Int(3)).unwrap(), 3);
        assert!(varuint_value(&DecodedValue::Null).is_err());
    }
}
