// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::string_table::STRING_TABLE_FIELD;
use crate::{
    encode_repeated, impl_embedded_message, repeated_proto_len, DecodeError, EncodeError, Field,
    Function, LengthDelimited, Location, Mapping, Message, RawField, Sample, StringTable, Value,
    ValueType, WireType, Writer, NO_OPT_ZERO, OPT_ZERO,
};

/// The top-level pprof message. It owns every other message as well as the
/// [StringTable] the other messages index into.
///
/// Fields are encoded in field-number order. The top-level message has no
/// length prefix.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Profile {
    /// A description of the samples associated with each Sample.value.
    /// For a cpu profile this might be:
    ///   \[\["cpu","nanoseconds"\]\] or \[\["wall","seconds"\]\] or \[\["syscall","count"\]\]
    /// For a heap profile, this might be:
    ///   \[\["allocations","count"\], \["space","bytes"\]\],
    /// If one of the values represents the number of events represented
    /// by the sample, by convention it should be at index 0 and use
    /// sample_type.unit == "count".
    pub sample_types: Vec<Field<ValueType, 1, NO_OPT_ZERO>>,
    /// The set of samples recorded in this profile.
    pub samples: Vec<Field<Sample, 2, NO_OPT_ZERO>>,
    /// Mapping from address ranges to the image/binary/library mapped
    /// into that address range. mapping\[0\] will be the main binary.
    pub mappings: Vec<Field<Mapping, 3, NO_OPT_ZERO>>,
    /// Useful program location.
    pub locations: Vec<Field<Location, 4, NO_OPT_ZERO>>,
    /// Functions referenced by locations.
    pub functions: Vec<Field<Function, 5, NO_OPT_ZERO>>,
    /// A common table for strings referenced by various messages.
    pub string_table: StringTable,
    /// Frames with Function.function_name fully matching the following
    /// regexp will be dropped from the samples, along with their successors.
    pub drop_frames: Field<i64, 7, OPT_ZERO>,
    /// Frames with Function.function_name fully matching the following
    /// regexp will be kept, even if it matches drop_frames.
    pub keep_frames: Field<i64, 8, OPT_ZERO>,
    /// Time of collection (UTC) represented as nanoseconds past the epoch.
    pub time_nanos: Field<i64, 9, OPT_ZERO>,
    /// Duration of the profile, if a duration makes sense.
    pub duration_nanos: Field<i64, 10, OPT_ZERO>,
    /// The kind of events between sampled occurrences. Unlike the scalar
    /// fields, an explicitly set all-zero ValueType is still written.
    pub period_type: Field<Option<ValueType>, 11, OPT_ZERO>,
    /// The number of events between sampled occurrences.
    pub period: Field<i64, 12, OPT_ZERO>,
    /// Free-form text associated with the profile, as string table indices.
    pub comments: Field<Vec<i64>, 13, OPT_ZERO>,
    /// Index into the string table of the type of the preferred sample
    /// value. If unset, clients should default to the last sample value.
    pub default_sample_type: Field<i64, 14, OPT_ZERO>,
}

impl Profile {
    /// Creates a profile which indexes into an existing string table.
    pub fn with_string_table(string_table: StringTable) -> Self {
        Self {
            string_table,
            ..Default::default()
        }
    }

    /// Shorthand for [StringTable::dedup] on the profile's own table.
    #[inline]
    pub fn intern(&mut self, s: &str) -> i64 {
        self.string_table.dedup(s)
    }

    /// Encoded length of the scalar fields following the string table.
    pub(crate) fn trailer_proto_len(&self) -> u64 {
        self.drop_frames.proto_len()
            + self.keep_frames.proto_len()
            + self.time_nanos.proto_len()
            + self.duration_nanos.proto_len()
            + self.period_type.proto_len()
            + self.period.proto_len()
            + self.comments.proto_len()
            + self.default_sample_type.proto_len()
    }

    /// Encodes the fields following the string table: 7 through 14.
    pub(crate) fn encode_trailer(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.drop_frames.encode(writer)?;
        self.keep_frames.encode(writer)?;
        self.time_nanos.encode(writer)?;
        self.duration_nanos.encode(writer)?;
        self.period_type.encode(writer)?;
        self.period.encode(writer)?;
        self.comments.encode(writer)?;
        self.default_sample_type.encode(writer)
    }

    fn fields_proto_len(&self) -> u64 {
        repeated_proto_len(&self.sample_types)
            + repeated_proto_len(&self.samples)
            + repeated_proto_len(&self.mappings)
            + repeated_proto_len(&self.locations)
            + repeated_proto_len(&self.functions)
            + self.string_table.encoded_len()
            + self.trailer_proto_len()
    }

    fn encode_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        encode_repeated(&self.sample_types, writer)?;
        encode_repeated(&self.samples, writer)?;
        encode_repeated(&self.mappings, writer)?;
        encode_repeated(&self.locations, writer)?;
        encode_repeated(&self.functions, writer)?;
        self.string_table.encode(writer)?;
        self.encode_trailer(writer)
    }

    fn merge_string(&mut self, field: RawField<'_>) -> Result<(), DecodeError> {
        if field.wire_type != WireType::LengthDelimited {
            return Err(DecodeError::WireTypeMismatch {
                field: STRING_TABLE_FIELD,
                expected: WireType::LengthDelimited,
                actual: field.wire_type,
            });
        }
        let s = std::str::from_utf8(field.payload).map_err(|_| DecodeError::InvalidUtf8)?;
        self.string_table.dedup(s);
        Ok(())
    }
}

impl_embedded_message!(Profile);

impl Message for Profile {
    fn merge_field(&mut self, field: RawField<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => Field::push_decoded(&mut self.sample_types, field),
            2 => Field::push_decoded(&mut self.samples, field),
            3 => Field::push_decoded(&mut self.mappings, field),
            4 => Field::push_decoded(&mut self.locations, field),
            5 => Field::push_decoded(&mut self.functions, field),
            STRING_TABLE_FIELD => self.merge_string(field),
            7 => self.drop_frames.merge(field),
            8 => self.keep_frames.merge(field),
            9 => self.time_nanos.merge(field),
            10 => self.duration_nanos.merge(field),
            11 => self.period_type.merge(field),
            12 => self.period.merge(field),
            13 => self.comments.merge(field),
            14 => self.default_sample_type.merge(field),
            _ => field.skip("Profile"),
        }
    }
}

/// An optional embedded message: `None` is the default and isn't written,
/// while `Some` is written even if the message itself is empty.
impl<T: LengthDelimited> Value for Option<T> {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn proto_len(&self) -> u64 {
        self.as_ref().map_or(0, Value::proto_len)
    }

    fn encode(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Some(value) => value.encode(writer),
            None => Ok(()),
        }
    }

    fn merge(&mut self, wire_type: WireType, payload: &[u8]) -> Result<(), DecodeError> {
        self.get_or_insert_with(T::default).merge(wire_type, payload)
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<&Profile> for crate::prost_impls::Profile {
    fn from(profile: &Profile) -> Self {
        use crate::prost_impls;
        Self {
            sample_types: profile
                .sample_types
                .iter()
                .map(|field| prost_impls::ValueType::from(field.value))
                .collect(),
            samples: profile
                .samples
                .iter()
                .map(|field| prost_impls::Sample::from(&field.value))
                .collect(),
            mappings: profile
                .mappings
                .iter()
                .map(|field| prost_impls::Mapping::from(field.value))
                .collect(),
            locations: profile
                .locations
                .iter()
                .map(|field| prost_impls::Location::from(&field.value))
                .collect(),
            functions: profile
                .functions
                .iter()
                .map(|field| prost_impls::Function::from(field.value))
                .collect(),
            // The leading empty string is implied on the wire, so it's left
            // out here too; that keeps the two encodings byte-identical.
            string_table: profile
                .string_table
                .iter()
                .skip(1)
                .map(String::from)
                .collect(),
            drop_frames: profile.drop_frames.value,
            keep_frames: profile.keep_frames.value,
            time_nanos: profile.time_nanos.value,
            duration_nanos: profile.duration_nanos.value,
            period_type: profile.period_type.value.map(prost_impls::ValueType::from),
            period: profile.period.value,
            comment: profile.comments.value.clone(),
            default_sample_type: profile.default_sample_type.value,
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<crate::prost_impls::Profile> for Profile {
    fn from(profile: crate::prost_impls::Profile) -> Self {
        fn convert<P, T: Value + From<P>, const N: u32>(list: Vec<P>) -> Vec<Field<T, N, NO_OPT_ZERO>> {
            list.into_iter().map(|item| Field::from(T::from(item))).collect()
        }

        Self {
            sample_types: convert(profile.sample_types),
            samples: convert(profile.samples),
            mappings: convert(profile.mappings),
            locations: convert(profile.locations),
            functions: convert(profile.functions),
            string_table: StringTable::from(profile.string_table),
            drop_frames: profile.drop_frames.into(),
            keep_frames: profile.keep_frames.into(),
            time_nanos: profile.time_nanos.into(),
            duration_nanos: profile.duration_nanos.into(),
            period_type: profile.period_type.map(ValueType::from).into(),
            period: profile.period.into(),
            comments: profile.comment.into(),
            default_sample_type: profile.default_sample_type.into(),
        }
    }
}
