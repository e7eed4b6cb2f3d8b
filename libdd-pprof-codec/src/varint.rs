// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Encoding and decoding of protobuf [`varint`]s.
//!
//! Values are handled as a pair of 32-bit words, see [LongBits]. Negative
//! numbers use the 64-bit two's complement representation, so they always
//! take 10 bytes on the wire.
//!
//! [`varint`]: https://protobuf.dev/programming-guides/encoding/#varints

use crate::{DecodeError, EncodeError, Value, Varint, WireType, Writer};

/// The longest a varint can be: 64 bits in 7-bit groups.
pub const MAX_VARINT_LEN: usize = 10;

/// A 64-bit value split into its high and low 32-bit words.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct LongBits {
    pub hi: u32,
    pub lo: u32,
}

impl LongBits {
    pub const ZERO: Self = Self { hi: 0, lo: 0 };

    #[inline]
    pub const fn from_u64(value: u64) -> Self {
        Self {
            hi: (value >> 32) as u32,
            lo: value as u32,
        }
    }

    /// Splits a signed value. Negative values are converted to two's
    /// complement explicitly: the magnitude is split, both words are
    /// complemented, and one is added to the low word with the carry going
    /// into the high word.
    pub const fn from_i64(value: i64) -> Self {
        let magnitude = value.unsigned_abs();
        let mut bits = Self::from_u64(magnitude);
        if value < 0 {
            bits.hi = !bits.hi;
            bits.lo = !bits.lo;
            bits.lo = bits.lo.wrapping_add(1);
            if bits.lo == 0 {
                bits.hi = bits.hi.wrapping_add(1);
            }
        }
        bits
    }

    #[inline]
    pub const fn to_u64(self) -> u64 {
        ((self.hi as u64) << 32) | self.lo as u64
    }

    #[inline]
    pub const fn to_i64(self) -> i64 {
        self.to_u64() as i64
    }

    /// The number of bytes the varint encoding takes, from 1 to 10. Checks
    /// which 7-bit groups are non-zero without producing them.
    pub const fn proto_len(self) -> u64 {
        let part0 = self.lo;
        let part1 = (self.lo >> 28) | (self.hi << 4);
        let part2 = self.hi >> 24;
        if part2 == 0 {
            if part1 == 0 {
                if part0 < 1 << 14 {
                    if part0 < 1 << 7 {
                        1
                    } else {
                        2
                    }
                } else if part0 < 1 << 21 {
                    3
                } else {
                    4
                }
            } else if part1 < 1 << 14 {
                if part1 < 1 << 7 {
                    5
                } else {
                    6
                }
            } else if part1 < 1 << 21 {
                7
            } else {
                8
            }
        } else if part2 < 1 << 7 {
            9
        } else {
            10
        }
    }

    /// The varint bytes, low groups first.
    #[inline]
    pub const fn bytes(self) -> VarintBytes {
        VarintBytes {
            bits: self,
            done: false,
        }
    }

    #[inline]
    pub fn encode(self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        for byte in self.bytes() {
            writer.put_u8(byte)?;
        }
        Ok(())
    }
}

/// Iterator over the bytes of a varint, see [LongBits::bytes].
#[derive(Clone, Debug)]
pub struct VarintBytes {
    bits: LongBits,
    done: bool,
}

impl Iterator for VarintBytes {
    type Item = u8;

    #[inline]
    fn next(&mut self) -> Option<u8> {
        if self.done {
            return None;
        }
        let LongBits { hi, lo } = self.bits;
        if hi == 0 && lo < 0x80 {
            self.done = true;
            return Some(lo as u8);
        }
        self.bits = LongBits {
            hi: hi >> 7,
            lo: (lo >> 7) | (hi << 25),
        };
        Some((lo & 0x7f) as u8 | 0x80)
    }
}

/// The number of bytes it takes to encode `value` as a varint.
#[inline]
pub const fn proto_len(value: u64) -> u64 {
    LongBits::from_u64(value).proto_len()
}

/// Encodes `value` as a varint. Zero is a single zero byte.
#[inline]
pub fn encode(value: u64, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
    LongBits::from_u64(value).encode(writer)
}

/// Decodes a varint at the start of `bytes`, returning the value and the
/// number of bytes it occupied.
///
/// Up to four groups (28 bits) are accumulated in a single `u32`, which
/// covers ids, indices and counts. Longer varints continue into the high word
/// of a [LongBits].
pub fn decode(bytes: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut lo: u32 = 0;
    for (i, &byte) in bytes.iter().take(4).enumerate() {
        lo |= u32::from(byte & 0x7f) << (7 * i);
        if byte < 0x80 {
            return Ok((u64::from(lo), i + 1));
        }
    }
    if bytes.len() <= 4 {
        return Err(truncated(bytes.len()));
    }
    decode_long(bytes, lo)
}

#[cold]
fn decode_long(bytes: &[u8], lo: u32) -> Result<(u64, usize), DecodeError> {
    let mut bits = LongBits { hi: 0, lo };

    // The fifth group straddles both words: 4 bits for lo, 3 bits for hi.
    let byte = bytes[4];
    bits.lo |= u32::from(byte & 0x7f) << 28;
    bits.hi = u32::from(byte & 0x7f) >> 4;
    if byte < 0x80 {
        return Ok((bits.to_u64(), 5));
    }

    for (i, &byte) in bytes.iter().enumerate().take(MAX_VARINT_LEN).skip(5) {
        bits.hi |= u32::from(byte & 0x7f) << (7 * (i - 5) + 3);
        if byte < 0x80 {
            return Ok((bits.to_u64(), i + 1));
        }
    }

    if bytes.len() < MAX_VARINT_LEN {
        Err(truncated(bytes.len()))
    } else {
        Err(DecodeError::VarintOverflow)
    }
}

#[inline]
fn truncated(remaining: usize) -> DecodeError {
    DecodeError::Truncated {
        needed: remaining + 1,
        remaining,
    }
}

/// The length of the varint at the start of `bytes`, without decoding it.
pub fn span(bytes: &[u8]) -> Result<usize, DecodeError> {
    match bytes.iter().take(MAX_VARINT_LEN).position(|b| b & 0x80 == 0) {
        Some(pos) => Ok(pos + 1),
        None if bytes.len() < MAX_VARINT_LEN => Err(truncated(bytes.len())),
        None => Err(DecodeError::VarintOverflow),
    }
}

/// Decodes a packed sequence of varints, as used by packed repeated fields.
#[inline]
pub fn decode_packed(bytes: &[u8]) -> PackedVarints<'_> {
    PackedVarints { bytes }
}

/// Iterator returned by [decode_packed]. After an error, it's exhausted.
#[derive(Clone, Debug)]
pub struct PackedVarints<'a> {
    bytes: &'a [u8],
}

impl Iterator for PackedVarints<'_> {
    type Item = Result<u64, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        match decode(self.bytes) {
            Ok((value, len)) => {
                self.bytes = self.bytes.get(len..).unwrap_or_default();
                Some(Ok(value))
            }
            Err(err) => {
                self.bytes = &[];
                Some(Err(err))
            }
        }
    }
}

impl Value for u64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    #[inline]
    fn proto_len(&self) -> u64 {
        proto_len(*self)
    }

    #[inline]
    fn encode(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        encode(*self, writer)
    }

    fn merge(&mut self, _wire_type: WireType, payload: &[u8]) -> Result<(), DecodeError> {
        *self = decode(payload)?.0;
        Ok(())
    }
}

impl Value for i64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    #[inline]
    fn proto_len(&self) -> u64 {
        LongBits::from_i64(*self).proto_len()
    }

    #[inline]
    fn encode(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        LongBits::from_i64(*self).encode(writer)
    }

    fn merge(&mut self, _wire_type: WireType, payload: &[u8]) -> Result<(), DecodeError> {
        *self = decode(payload)?.0 as i64;
        Ok(())
    }
}

impl Value for bool {
    const WIRE_TYPE: WireType = WireType::Varint;

    #[inline]
    fn proto_len(&self) -> u64 {
        1
    }

    #[inline]
    fn encode(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        writer.put_u8(u8::from(*self))
    }

    fn merge(&mut self, _wire_type: WireType, payload: &[u8]) -> Result<(), DecodeError> {
        *self = decode(payload)?.0 != 0;
        Ok(())
    }
}

unsafe impl Varint for u64 {
    #[inline]
    fn from_raw(raw: u64) -> Self {
        raw
    }
}

unsafe impl Varint for i64 {
    #[inline]
    fn from_raw(raw: u64) -> Self {
        raw as i64
    }
}

unsafe impl Varint for bool {
    #[inline]
    fn from_raw(raw: u64) -> Self {
        raw != 0
    }
}

/// Packed repeated varints. An empty vector is the default, so it's omitted
/// by an [crate::OPT_ZERO] field.
impl<T: Varint> Value for Vec<T> {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn proto_len(&self) -> u64 {
        self.iter().map(Value::proto_len).sum()
    }

    fn encode(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        for value in self.iter() {
            value.encode(writer)?;
        }
        Ok(())
    }

    fn merge(&mut self, wire_type: WireType, payload: &[u8]) -> Result<(), DecodeError> {
        match wire_type {
            // Parsers must accept the unpacked form as well.
            WireType::Varint => self.push(T::from_raw(decode(payload)?.0)),
            WireType::LengthDelimited => {
                for raw in decode_packed(payload) {
                    self.push(T::from_raw(raw?));
                }
            }
        }
        Ok(())
    }

    fn accepts(_wire_type: WireType) -> bool {
        true
    }
}

unsafe impl<T: Varint> crate::LengthDelimited for Vec<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_to_vec(bits: LongBits) -> Vec<u8> {
        let mut buffer = vec![0; bits.proto_len() as usize];
        let mut writer = Writer::new(&mut buffer, 0);
        bits.encode(&mut writer).unwrap();
        assert_eq!(writer.offset(), buffer.len());
        buffer
    }

    #[test]
    fn test_varint_range() {
        assert_eq!(0u64.proto_len(), 1);
        assert_eq!(0x7fu64.proto_len(), 1);
        assert_eq!(0x80u64.proto_len(), 2);
        assert_eq!(0x0fff_ffffu64.proto_len(), 4);
        assert_eq!(0x1000_0000u64.proto_len(), 5);
        assert_eq!(u64::MAX.proto_len(), 10);
        assert_eq!((-1i64).proto_len(), 10);
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encode_to_vec(LongBits::ZERO), [0x00]);
        assert_eq!(encode_to_vec(LongBits::from_u64(1)), [0x01]);
        assert_eq!(encode_to_vec(LongBits::from_u64(300)), [0xac, 0x02]);
        assert_eq!(
            encode_to_vec(LongBits::from_u64(1_000_000_000_000)),
            [0x80, 0xa0, 0x94, 0xa5, 0x8d, 0x1d]
        );
        assert_eq!(
            encode_to_vec(LongBits::from_i64(-1)),
            [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
        );
    }

    #[test]
    fn twos_complement_matches_cast() {
        for value in [-1i64, -2, -128, -(1 << 32), i64::MIN, i64::MIN + 1] {
            assert_eq!(
                LongBits::from_i64(value),
                LongBits::from_u64(value as u64),
                "{value}"
            );
        }
    }

    #[test]
    fn decode_known() {
        assert_eq!(decode(&[0x00]), Ok((0, 1)));
        assert_eq!(decode(&[0xac, 0x02, 0xff]), Ok((300, 2)));
        assert_eq!(
            decode(&[0x80, 0xa0, 0x94, 0xa5, 0x8d, 0x1d]),
            Ok((1_000_000_000_000, 6))
        );
    }

    #[test]
    fn decode_truncated() {
        assert_eq!(
            decode(&[]),
            Err(DecodeError::Truncated {
                needed: 1,
                remaining: 0
            })
        );
        assert_eq!(
            decode(&[0x80, 0x80]),
            Err(DecodeError::Truncated {
                needed: 3,
                remaining: 2
            })
        );
        assert_eq!(
            decode(&[0x80; 7]),
            Err(DecodeError::Truncated {
                needed: 8,
                remaining: 7
            })
        );
        assert_eq!(decode(&[0x80; 11]), Err(DecodeError::VarintOverflow));
    }

    #[test]
    fn span_bounds() {
        assert_eq!(span(&[0x05, 0x80]), Ok(1));
        assert_eq!(span(&[0x80, 0x80, 0x01]), Ok(3));
        assert!(matches!(span(&[0x80]), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn packed() {
        let values: Result<Vec<u64>, _> = decode_packed(&[0x01, 0xac, 0x02, 0x00]).collect();
        assert_eq!(values, Ok(vec![1, 300, 0]));

        let mut iter = decode_packed(&[0x01, 0x80]);
        assert_eq!(iter.next(), Some(Ok(1)));
        assert!(matches!(iter.next(), Some(Err(DecodeError::Truncated { .. }))));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn roundtrip_u64() {
        bolero::check!().with_type::<u64>().for_each(|value| {
            let bits = LongBits::from_u64(*value);
            let bytes = encode_to_vec(bits);
            assert_eq!(bits.proto_len() as usize, bytes.len());
            assert_eq!(decode(&bytes), Ok((*value, bytes.len())));
        });
    }

    #[test]
    fn roundtrip_i64() {
        bolero::check!().with_type::<i64>().for_each(|value| {
            let bits = LongBits::from_i64(*value);
            let bytes = encode_to_vec(bits);
            assert_eq!(value.proto_len() as usize, bytes.len());
            let (raw, len) = decode(&bytes).unwrap();
            assert_eq!(len, bytes.len());
            assert_eq!(raw as i64, *value);
            assert_eq!(LongBits::from_u64(raw).to_i64(), *value);
        });
    }
}
