//! Decoder for the tag-prefixed, self-describing section format.
//!
//! Header, details, initdata-free metadata and tracker events are stored
//! in this format: every value is preceded by a structure tag, struct
//! members carry explicit field tags, and unknown members can be skipped
//! without knowing their type. That skip path is what lets one build's
//! table read a neighboring build's sections.

use crate::buffer::BitPackedBuffer;
use crate::error::{ProtocolError, ProtocolResult};
use crate::typeinfo::TypeInfo;
use crate::value::DecodedValue;
use std::collections::BTreeMap;

const TAG_ARRAY: u8 = 0;
const TAG_BITARRAY: u8 = 1;
const TAG_BLOB: u8 = 2;
const TAG_CHOICE: u8 = 3;
const TAG_OPTIONAL: u8 = 4;
const TAG_STRUCT: u8 = 5;
const TAG_BOOL: u8 = 6;
const TAG_FOURCC: u8 = 7;
const TAG_U64: u8 = 8;
const TAG_VINT: u8 = 9;

/// Interpreter for the self-describing format over one build's type table.
pub struct VersionedDecoder<'a> {
    buffer: BitPackedBuffer<'a>,
    typeinfos: &'static [TypeInfo],
}

impl<'a> VersionedDecoder<'a> {
    /// Creates a decoder over `contents`.
    pub fn new(contents: &'a [u8], typeinfos: &'static [TypeInfo]) -> Self {
        Self {
            buffer: BitPackedBuffer::new(contents),
            typeinfos,
        }
    }

    /// Whether the input is exhausted.
    pub fn done(&self) -> bool {
        self.buffer.done()
    }

    /// Bits consumed so far.
    pub fn used_bits(&self) -> usize {
        self.buffer.used_bits()
    }

    /// Alignment is a no-op here; the format is byte-oriented throughout.
    pub fn byte_align(&mut self) {
        self.buffer.byte_align();
    }

    /// Decodes one instance of the given type-table entry.
    pub fn instance(&mut self, typeid: usize) -> ProtocolResult<DecodedValue> {
        let info = self.typeinfos.get(typeid).ok_or_else(|| {
            ProtocolError::InvalidData(format!("type id {typeid} outside the type table"))
        })?;
        match *info {
            TypeInfo::Int(_) => {
                self.expect_tag(TAG_VINT)?;
                Ok(DecodedValue::Int(self.vint()?))
            }
            TypeInfo::Blob(_) => {
                self.expect_tag(TAG_BLOB)?;
                let length = self.length()?;
                Ok(DecodedValue::Bytes(
                    self.buffer.read_aligned_bytes(length)?.to_vec(),
                ))
            }
            TypeInfo::Bool => {
                self.expect_tag(TAG_BOOL)?;
                Ok(DecodedValue::Bool(self.buffer.read_bits(8)? != 0))
            }
            TypeInfo::FourCc => {
                self.expect_tag(TAG_FOURCC)?;
                Ok(DecodedValue::Bytes(
                    self.buffer.read_aligned_bytes(4)?.to_vec(),
                ))
            }
            TypeInfo::BitArray(_) => {
                self.expect_tag(TAG_BITARRAY)?;
                let bits = self.length()?;
                let data = self.buffer.read_aligned_bytes(bits.div_ceil(8))?.to_vec();
                Ok(DecodedValue::BitArray {
                    bits: bits as u64,
                    data,
                })
            }
            TypeInfo::Optional(inner) => {
                self.expect_tag(TAG_OPTIONAL)?;
                if self.buffer.read_bits(8)? != 0 {
                    self.instance(inner)
                } else {
                    Ok(DecodedValue::Null)
                }
            }
            TypeInfo::Array { typeid: inner, .. } => {
                self.expect_tag(TAG_ARRAY)?;
                let length = self.length()?;
                let mut items = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    items.push(self.instance(inner)?);
                }
                Ok(DecodedValue::Array(items))
            }
            TypeInfo::Struct(fields) => {
                self.expect_tag(TAG_STRUCT)?;
                let mut result = BTreeMap::new();
                let member_count = self.length()?;
                for _ in 0..member_count {
                    let tag = self.vint()?;
                    match fields.iter().find(|field| field.tag == tag) {
                        Some(field) => {
                            let value = self.instance(field.typeid)?;
                            result.insert(field.name.to_owned(), value);
                        }
                        // Member from a neighboring build's layout.
                        None => self.skip_instance()?,
                    }
                }
                Ok(DecodedValue::Struct(result))
            }
            TypeInfo::Choice { variants, .. } => {
                self.expect_tag(TAG_CHOICE)?;
                let tag = self.vint()?;
                match variants.iter().find(|variant| variant.tag == tag) {
                    Some(variant) => {
                        let value = self.instance(variant.typeid)?;
                        let mut wrapper = BTreeMap::new();
                        wrapper.insert(variant.name.to_owned(), value);
                        Ok(DecodedValue::Struct(wrapper))
                    }
                    None => {
                        self.skip_instance()?;
                        Ok(DecodedValue::Struct(BTreeMap::new()))
                    }
                }
            }
            TypeInfo::Null => Ok(DecodedValue::Null),
        }
    }

    /// Skips one value of any type, guided purely by stream tags.
    pub fn skip_instance(&mut self) -> ProtocolResult<()> {
        let tag = self.buffer.read_bits(8)? as u8;
        match tag {
            TAG_ARRAY => {
                let length = self.length()?;
                for _ in 0..length {
                    self.skip_instance()?;
                }
            }
            TAG_BITARRAY => {
                let bits = self.length()?;
                self.buffer.read_aligned_bytes(bits.div_ceil(8))?;
            }
            TAG_BLOB => {
                let length = self.length()?;
                self.buffer.read_aligned_bytes(length)?;
            }
            TAG_CHOICE => {
                self.vint()?;
                self.skip_instance()?;
            }
            TAG_OPTIONAL => {
                if self.buffer.read_bits(8)? != 0 {
                    self.skip_instance()?;
                }
            }
            TAG_STRUCT => {
                let member_count = self.length()?;
                for _ in 0..member_count {
                    self.vint()?;
                    self.skip_instance()?;
                }
            }
            TAG_BOOL => {
                self.buffer.read_bits(8)?;
            }
            TAG_FOURCC => {
                self.buffer.read_aligned_bytes(4)?;
            }
            TAG_U64 => {
                self.buffer.read_aligned_bytes(8)?;
            }
            TAG_VINT => {
                self.vint()?;
            }
            other => {
                return Err(ProtocolError::InvalidData(format!(
                    "unknown structure tag {other} while skipping"
                )));
            }
        }
        Ok(())
    }

    fn expect_tag(&mut self, expected: u8) -> ProtocolResult<()> {
        let actual = self.buffer.read_bits(8)? as u8;
        if actual == expected {
            Ok(())
        } else {
            Err(ProtocolError::CorruptedTag {
                expected,
                actual,
                byte_offset: self.buffer.used_bytes() - 1,
            })
        }
    }

    /// Zigzag-signed, seven-bits-per-byte variable integer.
    fn vint(&mut self) -> ProtocolResult<i64> {
        let mut byte = self.buffer.read_bits(8)?;
        let negative = byte & 1 != 0;
        let mut result = (byte >> 1) as i64 & 0x3F;
        let mut shift = 6;
        while byte & 0x80 != 0 {
            byte = self.buffer.read_bits(8)?;
            if shift > 63 {
                return Err(ProtocolError::InvalidData(
                    "variable integer exceeds 64 bits".to_owned(),
                ));
            }
            result |= ((byte & 0x7F) as i64) << shift;
            shift += 7;
        }
        Ok(if negative { -result } else { result })
    }

    fn length(&mut self) -> ProtocolResult<usize> {
        let length = self.vint()?;
        usize::try_from(length)
            .map_err(|_| ProtocolError::InvalidData(format!("negative length {length}")))
    }
}
