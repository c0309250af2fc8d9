//! Decoder for the raw bit-packed section format.
//!
//! Game events, message events and lobby init data are stored without any
//! self-description: the type table alone dictates field order and bit
//! widths, and values are packed back to back at bit granularity.

use crate::buffer::BitPackedBuffer;
use crate::error::{ProtocolError, ProtocolResult};
use crate::typeinfo::{Bounds, TypeInfo};
use crate::value::DecodedValue;
use std::collections::BTreeMap;

/// Interpreter for the bit-packed format over one build's type table.
pub struct BitPackedDecoder<'a> {
    buffer: BitPackedBuffer<'a>,
    typeinfos: &'static [TypeInfo],
}

impl<'a> BitPackedDecoder<'a> {
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

    /// Discards the rest of the current partial byte.
    pub fn byte_align(&mut self) {
        self.buffer.byte_align();
    }

    /// Decodes one instance of the given type-table entry.
    pub fn instance(&mut self, typeid: usize) -> ProtocolResult<DecodedValue> {
        let info = self.typeinfos.get(typeid).ok_or_else(|| {
            ProtocolError::InvalidData(format!("type id {typeid} outside the type table"))
        })?;
        match *info {
            TypeInfo::Int(bounds) => Ok(DecodedValue::Int(self.bounded_int(bounds)?)),
            TypeInfo::Blob(bounds) => {
                let length = self.bounded_len(bounds)?;
                Ok(DecodedValue::Bytes(
                    self.buffer.read_aligned_bytes(length)?.to_vec(),
                ))
            }
            TypeInfo::Bool => Ok(DecodedValue::Bool(self.buffer.read_bits(1)? != 0)),
            TypeInfo::FourCc => Ok(DecodedValue::Bytes(self.buffer.read_unaligned_bytes(4)?)),
            TypeInfo::BitArray(bounds) => {
                let bits = self.bounded_len(bounds)?;
                Ok(DecodedValue::BitArray {
                    bits: bits as u64,
                    data: self.read_bit_run(bits)?,
                })
            }
            TypeInfo::Optional(inner) => {
                if self.buffer.read_bits(1)? != 0 {
                    self.instance(inner)
                } else {
                    Ok(DecodedValue::Null)
                }
            }
            TypeInfo::Array {
                bounds,
                typeid: inner,
            } => {
                let length = self.bounded_len(bounds)?;
                let mut items = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    items.push(self.instance(inner)?);
                }
                Ok(DecodedValue::Array(items))
            }
            TypeInfo::Struct(fields) => {
                // No tags on the wire: members appear in declared order.
                let mut result = BTreeMap::new();
                for field in fields {
                    let value = self.instance(field.typeid)?;
                    result.insert(field.name.to_owned(), value);
                }
                Ok(DecodedValue::Struct(result))
            }
            TypeInfo::Choice { bounds, variants } => {
                let tag = self.bounded_int(bounds)?;
                let variant = variants
                    .iter()
                    .find(|variant| variant.tag == tag)
                    .ok_or(ProtocolError::UnknownChoiceTag { tag })?;
                let value = self.instance(variant.typeid)?;
                let mut wrapper = BTreeMap::new();
                wrapper.insert(variant.name.to_owned(), value);
                Ok(DecodedValue::Struct(wrapper))
            }
            TypeInfo::Null => Ok(DecodedValue::Null),
        }
    }

    fn bounded_int(&mut self, bounds: Bounds) -> ProtocolResult<i64> {
        let raw = self.buffer.read_bits(bounds.bits)?;
        bounds.offset.checked_add_unsigned(raw).ok_or_else(|| {
            ProtocolError::InvalidData(format!("integer overflows 64 bits: {raw}"))
        })
    }

    fn bounded_len(&mut self, bounds: Bounds) -> ProtocolResult<usize> {
        let value = self.bounded_int(bounds)?;
        usize::try_from(value)
            .map_err(|_| ProtocolError::InvalidData(format!("negative length {value}")))
    }

    /// Reads `bits` into packed bytes, first-read bits in the first byte.
    fn read_bit_run(&mut self, bits: usize) -> ProtocolResult<Vec<u8>> {
        let mut data = Vec::with_capacity(bits.div_ceil(8));
        let mut remaining = bits;
        while remaining >= 8 {
            data.push(self.buffer.read_bits(8)? as u8);
            remaining -= 8;
        }
        if remaining > 0 {
            data.push(self.buffer.read_bits(remaining as u32)? as u8);
        }
        Ok(data)
    }
}
