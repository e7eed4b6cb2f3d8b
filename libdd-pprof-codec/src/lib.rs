// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! This crate implements a Protobuf encoder and decoder for [`profiles`]
//! without a protobuf runtime. It covers every message of the schema:
//!
//! - [Function]
//! - [Label]
//! - [Location] and [Line]
//! - [Mapping]
//! - [Sample]
//! - [ValueType]
//! - [Profile], which owns the [StringTable]
//!
//! Encoding is done in two passes: the length of a message is measured first
//! with [Message::measured_len], then the message is written into a buffer of
//! at least that many bytes with [Message::encode_into]. Nothing is allocated
//! during the second pass. Large profiles can also be encoded in bounded
//! steps with the [ChunkedEncoder], see [Profile::encode_chunked].
//!
//! Decoding walks the tags of a buffer and dispatches each field to the
//! message's [Message::merge_field]. Unknown field numbers are skipped.
//!
//! Indices into the string table are plain `i64`s, which is what the
//! `profile.proto` schema uses. ID fields are `u64`.
//!
//! [`profiles`]: https://github.com/google/pprof/blob/main/proto/profile.proto

mod chunked;
mod error;
mod function;
mod label;
mod location;
mod mapping;
mod profile;
mod sample;
mod string_table;
mod value_type;
pub mod varint;
pub mod wire;

#[cfg(any(test, feature = "prost_impls"))]
pub mod prost_impls;

pub use chunked::*;
pub use error::*;
pub use function::*;
pub use label::*;
pub use location::*;
pub use mapping::*;
pub use profile::*;
pub use sample::*;
pub use string_table::*;
pub use value_type::*;
pub use wire::{RawField, Tag, WireType, Writer};

use std::fmt::{Debug, Formatter};

/// Create a field of a given type, field number, and whether to perform the
/// zero-size optimization or not.
#[derive(Copy, Clone, Default, Eq, PartialEq)]
#[repr(transparent)]
#[cfg_attr(
    any(test, feature = "bolero"),
    derive(bolero::generator::TypeGenerator)
)]
pub struct Field<T: Value, const N: u32, const O: bool> {
    pub value: T,
}

/// A value is stored differently depending on the wire_type.
pub trait Value: Default + Eq {
    /// The wire type this value uses.
    const WIRE_TYPE: WireType;

    /// The number of bytes it takes to encode this value, excluding the tag
    /// and the length prefix.
    fn proto_len(&self) -> u64;

    /// Encode the value to the in-wire protobuf format.
    fn encode(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError>;

    /// Merges the payload of a field into the value. Scalars are overwritten,
    /// sequences are appended to and messages are merged field by field.
    fn merge(&mut self, wire_type: WireType, payload: &[u8]) -> Result<(), DecodeError>;

    /// Whether a field of this type may arrive with the given wire type.
    #[inline]
    fn accepts(wire_type: WireType) -> bool {
        wire_type == Self::WIRE_TYPE
    }
}

/// You can use varint to store any of the listed data types:
/// int32 | int64 | uint32 | uint64 | bool | enum
///
/// # Safety
///
/// The [`Value::WIRE_TYPE`] must be [`WireType::Varint`]!
pub unsafe trait Varint: Value + Sized {
    /// Converts the raw 64 bits of a decoded varint into the value.
    fn from_raw(raw: u64) -> Self;
}

/// You can use LengthDelimited to store any of the listed data types:
/// string, bytes, embedded messages, packed repeated fields
///
/// # Safety
///
/// The [`Value::WIRE_TYPE`] must be [`WireType::LengthDelimited`]!
pub unsafe trait LengthDelimited: Value + Sized {}

/// Intended to be provided to a Field to mean that it _should_ optimize for a
/// value of zero. See also [`NO_OPT_ZERO`].
pub const OPT_ZERO: bool = true;

/// Intended to be provided to a Field to mean that it shouldn't optimize for a
/// value of zero. Elements of repeated message fields use this, because an
/// empty message still occupies a slot in the sequence.
pub const NO_OPT_ZERO: bool = false;

impl<T: Value, const N: u32, const O: bool> From<T> for Field<T, N, O> {
    fn from(value: T) -> Self {
        Field { value }
    }
}

impl<T: Value, const N: u32, const O: bool> Field<T, N, O> {
    pub const NUMBER: u32 = N;

    pub fn proto_len(&self) -> u64 {
        if O && self.value == T::default() {
            return 0;
        }
        let proto_len = self.value.proto_len();
        let len = if T::WIRE_TYPE == WireType::LengthDelimited {
            varint::proto_len(proto_len)
        } else {
            0
        };
        let tag = Tag::new(N, T::WIRE_TYPE).proto_len();
        tag + len + proto_len
    }

    pub fn encode(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        if O && self.value == T::default() {
            return Ok(());
        }
        Tag::new(N, T::WIRE_TYPE).encode(writer)?;
        if T::WIRE_TYPE == WireType::LengthDelimited {
            varint::encode(self.value.proto_len(), writer)?;
        }
        self.value.encode(writer)
    }

    /// Merges a decoded field into this one. The caller is responsible for
    /// dispatching only fields numbered `N` here.
    pub fn merge(&mut self, field: RawField<'_>) -> Result<(), DecodeError> {
        debug_assert_eq!(field.number, N);
        if !T::accepts(field.wire_type) {
            return Err(DecodeError::WireTypeMismatch {
                field: N,
                expected: T::WIRE_TYPE,
                actual: field.wire_type,
            });
        }
        self.value.merge(field.wire_type, field.payload)
    }

    /// Decodes one element of a repeated field and appends it to `list`.
    pub fn push_decoded(list: &mut Vec<Self>, field: RawField<'_>) -> Result<(), DecodeError> {
        let mut element = Self::default();
        element.merge(field)?;
        list.push(element);
        Ok(())
    }
}

impl<T: Debug + Value, const N: u32, const O: bool> Debug for Field<T, N, O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("value", &self.value)
            .field("number", &N)
            .field("optimize_for_zero", &O)
            .finish()
    }
}

/// Sums the encoded length of every element of a repeated field.
#[inline]
pub fn repeated_proto_len<T: Value, const N: u32, const O: bool>(list: &[Field<T, N, O>]) -> u64 {
    list.iter().map(Field::proto_len).sum()
}

/// Encodes every element of a repeated field, in order.
#[inline]
pub fn encode_repeated<T: Value, const N: u32, const O: bool>(
    list: &[Field<T, N, O>],
    writer: &mut Writer<'_>,
) -> Result<(), EncodeError> {
    for field in list {
        field.encode(writer)?;
    }
    Ok(())
}

/// Protobuf messages need to fit in 2 GiB, which is plenty for profiling.
pub const PROTOBUF_MAX_MESSAGE_BYTES: u64 = (u32::MAX as u64) - 1;

/// A top-level protobuf message: something which can measure, encode, and
/// decode itself without a length prefix.
pub trait Message: Value {
    /// Dispatches one decoded field to the matching member. Field numbers
    /// which aren't part of the message are ignored.
    fn merge_field(&mut self, field: RawField<'_>) -> Result<(), DecodeError>;

    /// Merges every field found in `bytes` into the message.
    fn merge_fields(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        for field in wire::Fields::new(bytes) {
            self.merge_field(field?)?;
        }
        Ok(())
    }

    /// The exact number of bytes [Message::encode_into] will write.
    fn measured_len(&self) -> usize {
        self.proto_len() as usize
    }

    /// Encodes the message into `buffer` starting at `offset` and returns
    /// the offset just past the last written byte. Nothing is written if the
    /// buffer doesn't have [Message::measured_len] bytes available.
    fn encode_into(&self, buffer: &mut [u8], offset: usize) -> Result<usize, EncodeError> {
        let proto_len = self.proto_len();
        if proto_len > PROTOBUF_MAX_MESSAGE_BYTES {
            return Err(EncodeError::TooLarge { len: proto_len });
        }
        let required = proto_len as usize;
        let available = buffer.len().saturating_sub(offset);
        if required > available {
            return Err(EncodeError::BufferTooSmall {
                offset,
                required,
                available,
            });
        }
        let mut writer = Writer::new(buffer, offset);
        self.encode(&mut writer)?;
        debug_assert_eq!(writer.offset(), offset + required);
        Ok(writer.offset())
    }

    /// Encodes the message into a new buffer of exactly
    /// [Message::measured_len] bytes.
    fn encode_to_vec(&self) -> Result<Vec<u8>, EncodeError> {
        let proto_len = self.proto_len();
        if proto_len > PROTOBUF_MAX_MESSAGE_BYTES {
            return Err(EncodeError::TooLarge { len: proto_len });
        }
        let mut buffer = vec![0; proto_len as usize];
        self.encode_into(&mut buffer, 0)?;
        Ok(buffer)
    }

    /// Decodes a message, defaulting every field which isn't present.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut draft = Self::default();
        draft.merge_fields(bytes)?;
        Ok(draft)
    }
}

/// Implements [Value] and [LengthDelimited] for a [Message], so it can be
/// embedded in other messages.
macro_rules! impl_embedded_message {
    ($ty:ty) => {
        unsafe impl $crate::LengthDelimited for $ty {}

        impl $crate::Value for $ty {
            const WIRE_TYPE: $crate::WireType = $crate::WireType::LengthDelimited;

            fn proto_len(&self) -> u64 {
                self.fields_proto_len()
            }

            fn encode(&self, writer: &mut $crate::Writer<'_>) -> Result<(), $crate::EncodeError> {
                self.encode_fields(writer)
            }

            fn merge(
                &mut self,
                _wire_type: $crate::WireType,
                payload: &[u8],
            ) -> Result<(), $crate::DecodeError> {
                $crate::Message::merge_fields(self, payload)
            }
        }
    };
}
pub(crate) use impl_embedded_message;
