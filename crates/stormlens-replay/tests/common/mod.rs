#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, dead_code)]
//! Mirror-image wire encoders for building test archives.
//!
//! These encode [`DecodedValue`] trees against the same type tables the
//! decoders read, so fixtures are constructed programmatically instead of
//! shipped as opaque binaries.

use std::collections::BTreeMap;
use stormlens_protocol::{DecodedValue, ProtocolSchema, TypeInfo};

/// Bit-granular writer mirroring the decoder's read order: bits fill each
/// byte from the low end, multi-bit values are emitted most significant
/// chunk first.
pub struct BitWriter {
    out: Vec<u8>,
    cur: u8,
    cur_bits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            cur: 0,
            cur_bits: 0,
        }
    }

    pub fn write_bits(&mut self, value: u64, bits: u32) {
        let mut remaining = bits;
        while remaining > 0 {
            let copy_bits = (8 - self.cur_bits).min(remaining);
            let chunk = ((value >> (remaining - copy_bits)) & ((1u64 << copy_bits) - 1)) as u8;
            self.cur |= chunk << self.cur_bits;
            self.cur_bits += copy_bits;
            remaining -= copy_bits;
            if self.cur_bits == 8 {
                self.out.push(self.cur);
                self.cur = 0;
                self.cur_bits = 0;
            }
        }
    }

    pub fn byte_align(&mut self) {
        if self.cur_bits > 0 {
            self.out.push(self.cur);
            self.cur = 0;
            self.cur_bits = 0;
        }
    }

    pub fn write_aligned_bytes(&mut self, bytes: &[u8]) {
        self.byte_align();
        self.out.extend_from_slice(bytes);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.byte_align();
        self.out
    }
}

fn value_bytes(value: &DecodedValue) -> Vec<u8> {
    match value {
        DecodedValue::Bytes(bytes) => bytes.clone(),
        DecodedValue::Text(text) => text.clone().into_bytes(),
        other => panic!("expected bytes-like value, got {other:?}"),
    }
}

fn int_of(value: &DecodedValue) -> i64 {
    value.as_i64().expect("expected integer value")
}

fn choice_parts<'v>(
    typeinfos: &[TypeInfo],
    variants: &'static [stormlens_protocol::Variant],
    value: &'v DecodedValue,
) -> (i64, usize, &'v DecodedValue) {
    // Either an explicit single-variant wrapper, or a plain integer that
    // gets the narrowest variant it fits.
    if let DecodedValue::Struct(fields) = value {
        if fields.len() == 1 {
            let (name, inner) = fields.iter().next().expect("non-empty");
            let variant = variants
                .iter()
                .find(|variant| variant.name == name)
                .expect("variant name");
            return (variant.tag, variant.typeid, inner);
        }
    }
    let int = int_of(value);
    for variant in variants {
        if let TypeInfo::Int(bounds) = typeinfos[variant.typeid] {
            let relative = int - bounds.offset;
            if relative >= 0 && (bounds.bits >= 64 || (relative as u64) < (1u64 << bounds.bits)) {
                return (variant.tag, variant.typeid, value);
            }
        }
    }
    panic!("no variant fits value {int}");
}

// --- Versioned (tag-prefixed) encoding ---

fn write_vint(out: &mut Vec<u8>, value: i64) {
    let negative = value < 0;
    let mut rest = value.unsigned_abs();
    let mut byte = ((rest & 0x3F) << 1) as u8 | u8::from(negative);
    rest >>= 6;
    while rest != 0 {
        out.push(byte | 0x80);
        byte = (rest & 0x7F) as u8;
        rest >>= 7;
    }
    out.push(byte);
}

/// Encodes `value` as type `typeid` in the self-describing format.
pub fn encode_versioned(typeinfos: &'static [TypeInfo], typeid: usize, value: &DecodedValue) -> Vec<u8> {
    let mut out = Vec::new();
    write_versioned(typeinfos, typeid, value, &mut out);
    out
}

fn write_versioned(
    typeinfos: &'static [TypeInfo],
    typeid: usize,
    value: &DecodedValue,
    out: &mut Vec<u8>,
) {
    match typeinfos[typeid] {
        TypeInfo::Int(_) => {
            out.push(9);
            write_vint(out, int_of(value));
        }
        TypeInfo::Blob(_) => {
            let bytes = value_bytes(value);
            out.push(2);
            write_vint(out, bytes.len() as i64);
            out.extend_from_slice(&bytes);
        }
        TypeInfo::Bool => {
            out.push(6);
            out.push(u8::from(matches!(value, DecodedValue::Bool(true))));
        }
        TypeInfo::FourCc => {
            let bytes = value_bytes(value);
            assert_eq!(bytes.len(), 4, "four-character code");
            out.push(7);
            out.extend_from_slice(&bytes);
        }
        TypeInfo::BitArray(_) => {
            let DecodedValue::BitArray { bits, data } = value else {
                panic!("expected bit array");
            };
            out.push(1);
            write_vint(out, *bits as i64);
            out.extend_from_slice(data);
        }
        TypeInfo::Optional(inner) => {
            out.push(4);
            if matches!(value, DecodedValue::Null) {
                out.push(0);
            } else {
                out.push(1);
                write_versioned(typeinfos, inner, value, out);
            }
        }
        TypeInfo::Array { typeid: inner, .. } => {
            let items = value.as_array().expect("array value");
            out.push(0);
            write_vint(out, items.len() as i64);
            for item in items {
                write_versioned(typeinfos, inner, item, out);
            }
        }
        TypeInfo::Struct(fields) => {
            let map = value.as_struct().expect("struct value");
            let present: Vec<_> = fields
                .iter()
                .filter(|field| map.contains_key(field.name))
                .collect();
            out.push(5);
            write_vint(out, present.len() as i64);
            for field in present {
                write_vint(out, field.tag);
                write_versioned(typeinfos, field.typeid, &map[field.name], out);
            }
        }
        TypeInfo::Choice { variants, .. } => {
            let (tag, inner, payload) = choice_parts(typeinfos, variants, value);
            out.push(3);
            write_vint(out, tag);
            write_versioned(typeinfos, inner, payload, out);
        }
        TypeInfo::Null => {}
    }
}

// --- Bit-packed encoding ---

/// Encodes `value` as type `typeid` in the bit-packed format.
pub fn write_bitpacked(
    typeinfos: &'static [TypeInfo],
    typeid: usize,
    value: &DecodedValue,
    writer: &mut BitWriter,
) {
    match typeinfos[typeid] {
        TypeInfo::Int(bounds) => {
            let relative = int_of(value) - bounds.offset;
            writer.write_bits(relative as u64, bounds.bits);
        }
        TypeInfo::Blob(bounds) => {
            let bytes = value_bytes(value);
            writer.write_bits(bytes.len() as u64, bounds.bits);
            writer.write_aligned_bytes(&bytes);
        }
        TypeInfo::Bool => {
            writer.write_bits(u64::from(matches!(value, DecodedValue::Bool(true))), 1);
        }
        TypeInfo::FourCc => {
            for byte in value_bytes(value) {
                writer.write_bits(u64::from(byte), 8);
            }
        }
        TypeInfo::BitArray(bounds) => {
            let DecodedValue::BitArray { bits, data } = value else {
                panic!("expected bit array");
            };
            writer.write_bits(*bits, bounds.bits);
            let mut remaining = *bits;
            for byte in data {
                let chunk = remaining.min(8);
                writer.write_bits(u64::from(*byte), chunk as u32);
                remaining -= chunk;
            }
        }
        TypeInfo::Optional(inner) => {
            if matches!(value, DecodedValue::Null) {
                writer.write_bits(0, 1);
            } else {
                writer.write_bits(1, 1);
                write_bitpacked(typeinfos, inner, value, writer);
            }
        }
        TypeInfo::Array { bounds, typeid: inner } => {
            let items = value.as_array().expect("array value");
            writer.write_bits(items.len() as u64, bounds.bits);
            for item in items {
                write_bitpacked(typeinfos, inner, item, writer);
            }
        }
        TypeInfo::Struct(fields) => {
            let map = value.as_struct().expect("struct value");
            for field in fields {
                write_bitpacked(typeinfos, field.typeid, &map[field.name], writer);
            }
        }
        TypeInfo::Choice { bounds, variants } => {
            let (tag, inner, payload) = choice_parts(typeinfos, variants, value);
            writer.write_bits(tag as u64, bounds.bits);
            write_bitpacked(typeinfos, inner, payload, writer);
        }
        TypeInfo::Null => {}
    }
}

// --- Event stream encoding ---

/// One event to place on a stream: gameloop delta, user id (ignored for
/// tracker streams), event id, payload fields.
pub struct TestEvent {
    pub delta: i64,
    pub userid: i64,
    pub eventid: i64,
    pub payload: DecodedValue,
}

fn event_typeid(table: &[stormlens_protocol::EventType], eventid: i64) -> usize {
    table
        .iter()
        .find(|entry| entry.eventid == eventid)
        .unwrap_or_else(|| panic!("event id {eventid} not in table"))
        .typeid
}

/// Encodes a bit-packed event stream (game or message events).
pub fn encode_bitpacked_stream(
    schema: &'static ProtocolSchema,
    table: &'static [stormlens_protocol::EventType],
    eventid_typeid: usize,
    events: &[TestEvent],
) -> Vec<u8> {
    let mut writer = BitWriter::new();
    for event in events {
        write_bitpacked(
            schema.typeinfos,
            schema.gameloop_delta_typeid,
            &DecodedValue::Int(event.delta),
            &mut writer,
        );
        write_bitpacked(
            schema.typeinfos,
            schema.userid_typeid,
            &obj(vec![("m_userId", DecodedValue::Int(event.userid))]),
            &mut writer,
        );
        write_bitpacked(
            schema.typeinfos,
            eventid_typeid,
            &DecodedValue::Int(event.eventid),
            &mut writer,
        );
        write_bitpacked(
            schema.typeinfos,
            event_typeid(table, event.eventid),
            &event.payload,
            &mut writer,
        );
        writer.byte_align();
    }
    writer.finish()
}

/// Encodes the game event stream.
pub fn encode_game_events(schema: &'static ProtocolSchema, events: &[TestEvent]) -> Vec<u8> {
    encode_bitpacked_stream(
        schema,
        schema.game_event_types,
        schema.game_eventid_typeid,
        events,
    )
}

/// Encodes the message event stream.
pub fn encode_message_events(schema: &'static ProtocolSchema, events: &[TestEvent]) -> Vec<u8> {
    encode_bitpacked_stream(
        schema,
        schema.message_event_types,
        schema.message_eventid_typeid,
        events,
    )
}

/// Encodes the tracker event stream (self-describing format, no user id).
pub fn encode_tracker_events(schema: &'static ProtocolSchema, events: &[TestEvent]) -> Vec<u8> {
    let mut out = Vec::new();
    for event in events {
        write_versioned(
            schema.typeinfos,
            schema.gameloop_delta_typeid,
            &DecodedValue::Int(event.delta),
            &mut out,
        );
        write_versioned(
            schema.typeinfos,
            schema.tracker_eventid_typeid,
            &DecodedValue::Int(event.eventid),
            &mut out,
        );
        write_versioned(
            schema.typeinfos,
            event_typeid(schema.tracker_event_types, event.eventid),
            &event.payload,
            &mut out,
        );
    }
    out
}

/// Encodes an attributes section: source byte, map namespace, then one
/// record per (namespace, attrid, scope, value).
pub fn encode_attributes(
    source: u8,
    map_namespace: u32,
    records: &[(u32, u32, u8, [u8; 4])],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(source);
    out.extend_from_slice(&map_namespace.to_le_bytes());
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    for (namespace, attrid, scope, value) in records {
        out.extend_from_slice(&namespace.to_le_bytes());
        out.extend_from_slice(&attrid.to_le_bytes());
        out.push(*scope);
        out.extend_from_slice(value);
    }
    out
}

// --- Value construction helpers ---

/// Builds a struct value from name/value pairs.
pub fn obj(pairs: Vec<(&str, DecodedValue)>) -> DecodedValue {
    let mut fields = BTreeMap::new();
    for (name, value) in pairs {
        fields.insert(name.to_owned(), value);
    }
    DecodedValue::Struct(fields)
}

/// Builds a bytes value from text.
pub fn blob(text: &str) -> DecodedValue {
    DecodedValue::Bytes(text.as_bytes().to_vec())
}

/// Header tree for the base schema with the given base build.
pub fn header_value(base_build: i64) -> DecodedValue {
    obj(vec![
        ("m_signature", blob("Heroes of the Storm replay\u{1b}11")),
        (
            "m_version",
            obj(vec![
                ("m_flags", DecodedValue::Int(1)),
                ("m_major", DecodedValue::Int(0)),
                ("m_minor", DecodedValue::Int(9)),
                ("m_revision", DecodedValue::Int(1)),
                ("m_build", DecodedValue::Int(base_build)),
                ("m_baseBuild", DecodedValue::Int(base_build)),
            ]),
        ),
        ("m_type", DecodedValue::Int(2)),
        ("m_elapsedGameLoops", DecodedValue::Int(10_000)),
        ("m_useScaledTime", DecodedValue::Bool(true)),
    ])
}

/// One details player entry.
pub fn player(name: &str, team: i64, hero: &str, result: i64) -> DecodedValue {
    obj(vec![
        ("m_name", blob(name)),
        (
            "m_toon",
            obj(vec![
                ("m_region", DecodedValue::Int(1)),
                ("m_programId", blob("Hero")),
                ("m_realm", DecodedValue::Int(1)),
                ("m_id", DecodedValue::Int(1_234_567)),
            ]),
        ),
        ("m_race", blob("")),
        (
            "m_color",
            obj(vec![
                ("m_a", DecodedValue::Int(255)),
                ("m_r", DecodedValue::Int(90)),
                ("m_g", DecodedValue::Int(118)),
                ("m_b", DecodedValue::Int(230)),
            ]),
        ),
        ("m_control", DecodedValue::Int(2)),
        ("m_teamId", DecodedValue::Int(team)),
        ("m_handicap", DecodedValue::Int(100)),
        ("m_observe", DecodedValue::Int(0)),
        ("m_result", DecodedValue::Int(result)),
        ("m_workingSetSlotId", DecodedValue::Int(0)),
        ("m_hero", blob(hero)),
    ])
}

/// Details tree with the given players.
pub fn details_value(players: Vec<DecodedValue>) -> DecodedValue {
    obj(vec![
        ("m_playerList", DecodedValue::Array(players)),
        ("m_title", blob("Cursed Hollow")),
        ("m_difficulty", blob("VyEy")),
        ("m_thumbnail", obj(vec![("m_file", blob("Minimap.tga"))])),
        ("m_isBlizzardMap", DecodedValue::Bool(true)),
        ("m_timeUTC", DecodedValue::Int(130_929_105_013_806_015)),
        ("m_timeLocalOffset", DecodedValue::Int(-25_200_000_000)),
        ("m_description", blob("")),
        ("m_imageFilePath", blob("")),
        ("m_mapFileName", blob("CursedHollow.StormMap")),
        ("m_miniSave", DecodedValue::Bool(false)),
        ("m_gameSpeed", DecodedValue::Int(4)),
        ("m_defaultDifficulty", DecodedValue::Int(7)),
    ])
}
