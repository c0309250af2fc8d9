//! Decoded-value tree.
//!
//! Every decode operation produces a [`DecodedValue`]: a tagged tree of
//! structs, arrays, scalars, and raw byte buffers. Schemas differ per
//! build, so no fixed record layout is imposed; downstream code walks the
//! tree through the accessor helpers or serializes it to JSON.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;

/// One node of a decoded replay structure.
///
/// Trees are acyclic by construction: decoders only ever build leaves
/// upward. `Bytes` nodes are raw decode output; normalization (in the
/// extraction layer) rewrites them to `Text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    /// Absent value
    Null,
    /// Boolean flag
    Bool(bool),
    /// Signed integer; covers every integer width the wire formats carry
    Int(i64),
    /// Raw byte buffer (blob or four-character code), pre-normalization
    Bytes(Vec<u8>),
    /// Text, produced by normalization or by tests constructing expected trees
    Text(String),
    /// Bit array with an exact bit length
    BitArray {
        /// Number of meaningful bits
        bits: u64,
        /// Packed bit data
        data: Vec<u8>,
    },
    /// Ordered sequence
    Array(Vec<DecodedValue>),
    /// Keyed structure
    Struct(BTreeMap<String, DecodedValue>),
}

impl DecodedValue {
    /// Looks up a field on a struct value.
    pub fn field(&self, name: &str) -> Option<&DecodedValue> {
        match self {
            Self::Struct(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Walks a dotted path of struct fields, e.g. `m_version.m_baseBuild`.
    pub fn get(&self, path: &str) -> Option<&DecodedValue> {
        path.split('.')
            .try_fold(self, |value, segment| value.field(segment))
    }

    /// Integer payload, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Text payload, if this is a `Text`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Byte payload, if this is a `Bytes`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Element list, if this is an `Array`.
    pub fn as_array(&self) -> Option<&[DecodedValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Field map, if this is a `Struct`.
    pub fn as_struct(&self) -> Option<&BTreeMap<String, DecodedValue>> {
        match self {
            Self::Struct(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<bool> for DecodedValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DecodedValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for DecodedValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for DecodedValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for DecodedValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl Serialize for DecodedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Bytes(bytes) => serializer.serialize_bytes(bytes),
            Self::Text(text) => serializer.serialize_str(text),
            Self::BitArray { bits, data } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("bits", bits)?;
                map.serialize_entry("data", data)?;
                map.end()
            }
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Struct(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}
