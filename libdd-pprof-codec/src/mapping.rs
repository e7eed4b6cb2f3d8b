// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{
    impl_embedded_message, DecodeError, EncodeError, Field, Message, RawField, Writer, OPT_ZERO,
};

/// Describes the mapping of a binary in memory, including its address range,
/// file offset, and metadata like build ID.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "bolero"),
    derive(bolero::generator::TypeGenerator)
)]
pub struct Mapping {
    /// Unique nonzero id for the mapping.
    pub id: Field<u64, 1, OPT_ZERO>,
    /// Address at which the binary (or DLL) is loaded into memory.
    pub memory_start: Field<u64, 2, OPT_ZERO>,
    /// The limit of the address range occupied by this mapping.
    pub memory_limit: Field<u64, 3, OPT_ZERO>,
    /// Offset in the binary that corresponds to the first mapped address.
    pub file_offset: Field<u64, 4, OPT_ZERO>,
    /// The object this entry is loaded from. This can be a filename on
    /// disk for the main binary and shared libraries, or virtual
    /// abstractions like "\[vdso\]".
    pub filename: Field<i64, 5, OPT_ZERO>,
    /// A string that uniquely identifies a particular program version
    /// with high probability. E.g., for binaries generated by GNU tools,
    /// it could be the contents of the .note.gnu.build-id field.
    pub build_id: Field<i64, 6, OPT_ZERO>,
    pub has_functions: Field<bool, 7, OPT_ZERO>,
    pub has_filenames: Field<bool, 8, OPT_ZERO>,
    pub has_line_numbers: Field<bool, 9, OPT_ZERO>,
    pub has_inline_frames: Field<bool, 10, OPT_ZERO>,
}

impl Mapping {
    fn fields_proto_len(&self) -> u64 {
        self.id.proto_len()
            + self.memory_start.proto_len()
            + self.memory_limit.proto_len()
            + self.file_offset.proto_len()
            + self.filename.proto_len()
            + self.build_id.proto_len()
            + self.has_functions.proto_len()
            + self.has_filenames.proto_len()
            + self.has_line_numbers.proto_len()
            + self.has_inline_frames.proto_len()
    }

    fn encode_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.id.encode(writer)?;
        self.memory_start.encode(writer)?;
        self.memory_limit.encode(writer)?;
        self.file_offset.encode(writer)?;
        self.filename.encode(writer)?;
        self.build_id.encode(writer)?;
        self.has_functions.encode(writer)?;
        self.has_filenames.encode(writer)?;
        self.has_line_numbers.encode(writer)?;
        self.has_inline_frames.encode(writer)
    }
}

impl_embedded_message!(Mapping);

impl Message for Mapping {
    fn merge_field(&mut self, field: RawField<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.id.merge(field),
            2 => self.memory_start.merge(field),
            3 => self.memory_limit.merge(field),
            4 => self.file_offset.merge(field),
            5 => self.filename.merge(field),
            6 => self.build_id.merge(field),
            7 => self.has_functions.merge(field),
            8 => self.has_filenames.merge(field),
            9 => self.has_line_numbers.merge(field),
            10 => self.has_inline_frames.merge(field),
            _ => field.skip("Mapping"),
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<Mapping> for crate::prost_impls::Mapping {
    fn from(mapping: Mapping) -> Self {
        Self::from(&mapping)
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<&Mapping> for crate::prost_impls::Mapping {
    fn from(mapping: &Mapping) -> Self {
        Self {
            id: mapping.id.value,
            memory_start: mapping.memory_start.value,
            memory_limit: mapping.memory_limit.value,
            file_offset: mapping.file_offset.value,
            filename: mapping.filename.value,
            build_id: mapping.build_id.value,
            has_functions: mapping.has_functions.value,
            has_filenames: mapping.has_filenames.value,
            has_line_numbers: mapping.has_line_numbers.value,
            has_inline_frames: mapping.has_inline_frames.value,
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<crate::prost_impls::Mapping> for Mapping {
    fn from(mapping: crate::prost_impls::Mapping) -> Self {
        Self {
            id: mapping.id.into(),
            memory_start: mapping.memory_start.into(),
            memory_limit: mapping.memory_limit.into(),
            file_offset: mapping.file_offset.into(),
            filename: mapping.filename.into(),
            build_id: mapping.build_id.into(),
            has_functions: mapping.has_functions.into(),
            has_filenames: mapping.has_filenames.into(),
            has_line_numbers: mapping.has_line_numbers.into(),
            has_inline_frames: mapping.has_inline_frames.into(),
        }
    }
}
