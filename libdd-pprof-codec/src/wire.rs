// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire-level building blocks: tags, the output cursor, and the field loop
//! shared by every message decoder.

use crate::{varint, DecodeError, EncodeError};

/// Represents the wire type for the in-wire protobuf encoding. There are more
/// types than are represented here; these are just the supported ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    LengthDelimited = 2,
}

impl TryFrom<u8> for WireType {
    /// The unsupported wire type.
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            2 => Ok(WireType::LengthDelimited),
            other => Err(other),
        }
    }
}

/// The smallest possible protobuf field number.
const MIN_FIELD: u32 = 1;

/// The largest possible protobuf field number.
const MAX_FIELD: u32 = (1 << 29) - 1;

/// A tag is a combination of a wire_type, stored in the least significant
/// three bits, and the field number that is defined in the .proto file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Tag(u32);

impl Tag {
    #[cfg_attr(debug_assertions, track_caller)]
    #[inline]
    pub const fn new(field: u32, wire_type: WireType) -> Self {
        debug_assert!(field >= MIN_FIELD && field <= MAX_FIELD);
        Self((field << 3) | wire_type as u32)
    }

    /// The tag as it's written, before varint encoding.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn field(self) -> u32 {
        self.0 >> 3
    }

    #[inline]
    pub const fn proto_len(self) -> u64 {
        varint::proto_len(self.0 as u64)
    }

    #[inline]
    pub fn encode(self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        varint::encode(self.0 as u64, writer)
    }
}

/// Writes into a caller-supplied buffer, starting at a caller-supplied
/// offset. Writing past the end of the buffer is an error rather than a
/// panic or a silent truncation.
#[derive(Debug)]
pub struct Writer<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> Writer<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8], offset: usize) -> Self {
        Self { buffer, offset }
    }

    /// The offset of the next byte to be written.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    #[inline]
    pub fn put_u8(&mut self, byte: u8) -> Result<(), EncodeError> {
        match self.buffer.get_mut(self.offset) {
            Some(slot) => {
                *slot = byte;
                self.offset += 1;
                Ok(())
            }
            None => Err(self.too_small(1)),
        }
    }

    #[inline]
    pub fn put_slice(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        let end = self.offset.saturating_add(bytes.len());
        match self.buffer.get_mut(self.offset..end) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                self.offset = end;
                Ok(())
            }
            None => Err(self.too_small(bytes.len())),
        }
    }

    #[cold]
    fn too_small(&self, required: usize) -> EncodeError {
        EncodeError::BufferTooSmall {
            offset: self.offset,
            required,
            available: self.remaining(),
        }
    }
}

/// One field as found on the wire. For varints, the payload is the varint's
/// bytes; for length-delimited fields it excludes the length prefix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RawField<'a> {
    pub number: u32,
    pub wire_type: WireType,
    pub payload: &'a [u8],
}

impl RawField<'_> {
    /// Handles a field number the message doesn't know about. These are
    /// skipped so that newer producers can add fields.
    #[inline]
    pub fn skip(self, message_type: &'static str) -> Result<(), DecodeError> {
        tracing::trace!(
            message_type,
            field = self.number,
            wire_type = ?self.wire_type,
            len = self.payload.len(),
            "skipping unknown protobuf field"
        );
        Ok(())
    }
}

/// Iterates over the fields of an encoded message. Stops after the first
/// error.
#[derive(Clone, Debug)]
pub struct Fields<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Fields<'a> {
    #[inline]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn read_field(&mut self) -> Result<RawField<'a>, DecodeError> {
        let start = self.offset;
        let rest = self.bytes.get(start..).unwrap_or_default();

        let (tag, tag_len) = varint::decode(rest)?;
        let wire_type = WireType::try_from((tag & 0b111) as u8).map_err(|wire_type| {
            DecodeError::UnsupportedWireType {
                wire_type,
                offset: start,
            }
        })?;
        let number = tag >> 3;
        if number < u64::from(MIN_FIELD) || number > u64::from(MAX_FIELD) {
            return Err(DecodeError::InvalidTag { tag });
        }

        let body = rest.get(tag_len..).unwrap_or_default();
        let (payload, consumed) = match wire_type {
            WireType::Varint => {
                let len = varint::span(body)?;
                (body.get(..len).unwrap_or_default(), len)
            }
            WireType::LengthDelimited => {
                let (len, prefix_len) = varint::decode(body)?;
                let remaining = body.len() - prefix_len;
                let len = match usize::try_from(len) {
                    Ok(len) if len <= remaining => len,
                    _ => {
                        return Err(DecodeError::Truncated {
                            needed: usize::try_from(len).unwrap_or(usize::MAX),
                            remaining,
                        })
                    }
                };
                let end = prefix_len + len;
                (body.get(prefix_len..end).unwrap_or_default(), end)
            }
        };

        self.offset = start + tag_len + consumed;
        Ok(RawField {
            number: number as u32,
            wire_type,
            payload,
        })
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<RawField<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let result = self.read_field();
        if result.is_err() {
            self.offset = self.bytes.len();
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(bytes: &[u8]) -> Result<Vec<RawField<'_>>, DecodeError> {
        Fields::new(bytes).collect()
    }

    #[test]
    fn tags() {
        assert_eq!(Tag::new(1, WireType::LengthDelimited), Tag(0x0a));
        assert_eq!(Tag::new(7, WireType::Varint), Tag(0x38));
        assert_eq!(Tag::new(11, WireType::LengthDelimited).field(), 11);
        assert_eq!(Tag::new(16, WireType::Varint).proto_len(), 2);
    }

    #[test]
    fn fields_of_each_kind() {
        let bytes = [0x08, 0xac, 0x02, 0x12, 0x02, 0x01, 0x02, 0x18, 0x00];
        let fields = collect(&bytes).unwrap();
        assert_eq!(
            fields,
            vec![
                RawField {
                    number: 1,
                    wire_type: WireType::Varint,
                    payload: &[0xac, 0x02],
                },
                RawField {
                    number: 2,
                    wire_type: WireType::LengthDelimited,
                    payload: &[0x01, 0x02],
                },
                RawField {
                    number: 3,
                    wire_type: WireType::Varint,
                    payload: &[0x00],
                },
            ]
        );
    }

    #[test]
    fn empty_buffer_has_no_fields() {
        assert_eq!(collect(&[]), Ok(vec![]));
    }

    #[test]
    fn unsupported_wire_types() {
        // field 1, fixed64
        assert_eq!(
            collect(&[0x09, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(DecodeError::UnsupportedWireType {
                wire_type: 1,
                offset: 0
            })
        );
        // field 2, fixed32, after a valid field
        assert_eq!(
            collect(&[0x08, 0x01, 0x15, 0, 0, 0, 0]),
            Err(DecodeError::UnsupportedWireType {
                wire_type: 5,
                offset: 2
            })
        );
    }

    #[test]
    fn truncated_length_delimited() {
        assert_eq!(
            collect(&[0x0a, 0x05, 0x01, 0x02]),
            Err(DecodeError::Truncated {
                needed: 5,
                remaining: 2
            })
        );
    }

    #[test]
    fn truncated_varint() {
        assert!(matches!(
            collect(&[0x08, 0x80]),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn field_zero_is_invalid() {
        assert_eq!(collect(&[0x00, 0x01]), Err(DecodeError::InvalidTag { tag: 0 }));
    }

    #[test]
    fn iteration_stops_after_error() {
        let mut fields = Fields::new(&[0x0b, 0x08, 0x01]);
        assert!(fields.next().unwrap().is_err());
        assert!(fields.next().is_none());
    }

    #[test]
    fn writer_bounds() {
        let mut buffer = [0u8; 2];
        let mut writer = Writer::new(&mut buffer, 1);
        writer.put_u8(7).unwrap();
        assert_eq!(
            writer.put_u8(8),
            Err(EncodeError::BufferTooSmall {
                offset: 2,
                required: 1,
                available: 0
            })
        );
        assert!(writer.put_slice(&[1, 2]).is_err());
        assert_eq!(writer.offset(), 2);
        assert_eq!(buffer, [0, 7]);
    }
}
