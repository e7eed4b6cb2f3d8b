// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{
    encode_repeated, impl_embedded_message, repeated_proto_len, DecodeError, EncodeError, Field,
    Message, RawField, Writer, NO_OPT_ZERO, OPT_ZERO,
};

/// Describes function and line table debug information.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "bolero"),
    derive(bolero::generator::TypeGenerator)
)]
pub struct Location {
    /// Unique nonzero id for the location. A profile could use instruction
    /// addresses or any integer sequence as ids.
    pub id: Field<u64, 1, OPT_ZERO>,
    /// The id of the corresponding profile.Mapping for this location.
    /// It can be unset if the mapping is unknown or not applicable for
    /// this profile type.
    pub mapping_id: Field<u64, 2, OPT_ZERO>,
    /// The instruction address for this location, if available. It should be
    /// within `Mapping.memory_start..Mapping.memory_limit` for the
    /// corresponding mapping. A non-leaf address may be in the middle of a
    /// call instruction. It is up to display tools to find the beginning of
    /// the instruction if necessary.
    pub address: Field<u64, 3, OPT_ZERO>,
    /// Multiple line indicates this location has inlined functions, where the
    /// last entry represents the caller into which the preceding entries were
    /// inlined.
    pub lines: Vec<Field<Line, 4, NO_OPT_ZERO>>,
    /// Provides an indication that multiple symbols map to this location's
    /// address, for example due to identical code folding by the linker.
    pub is_folded: Field<bool, 5, OPT_ZERO>,
}

/// Represents function and line number information. Omits column.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "bolero"),
    derive(bolero::generator::TypeGenerator)
)]
pub struct Line {
    /// The id of the corresponding profile.Function for this line.
    pub function_id: Field<u64, 1, OPT_ZERO>,
    /// Line number in source code.
    pub line: Field<i64, 2, OPT_ZERO>,
}

impl Line {
    fn fields_proto_len(&self) -> u64 {
        self.function_id.proto_len() + self.line.proto_len()
    }

    fn encode_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.function_id.encode(writer)?;
        self.line.encode(writer)
    }
}

impl_embedded_message!(Line);

impl Message for Line {
    fn merge_field(&mut self, field: RawField<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.function_id.merge(field),
            2 => self.line.merge(field),
            _ => field.skip("Line"),
        }
    }
}

impl Location {
    fn fields_proto_len(&self) -> u64 {
        self.id.proto_len()
            + self.mapping_id.proto_len()
            + self.address.proto_len()
            + repeated_proto_len(&self.lines)
            + self.is_folded.proto_len()
    }

    fn encode_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.id.encode(writer)?;
        self.mapping_id.encode(writer)?;
        self.address.encode(writer)?;
        encode_repeated(&self.lines, writer)?;
        self.is_folded.encode(writer)
    }
}

impl_embedded_message!(Location);

impl Message for Location {
    fn merge_field(&mut self, field: RawField<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.id.merge(field),
            2 => self.mapping_id.merge(field),
            3 => self.address.merge(field),
            4 => Field::push_decoded(&mut self.lines, field),
            5 => self.is_folded.merge(field),
            _ => field.skip("Location"),
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<Line> for crate::prost_impls::Line {
    fn from(line: Line) -> Self {
        // If the prost file is regenerated, this may pick up new members,
        // such as column.
        #[allow(clippy::needless_update)]
        Self {
            function_id: line.function_id.value,
            line: line.line.value,
            ..Self::default()
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<crate::prost_impls::Line> for Line {
    fn from(line: crate::prost_impls::Line) -> Self {
        Self {
            function_id: line.function_id.into(),
            line: line.line.into(),
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<&Location> for crate::prost_impls::Location {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id.value,
            mapping_id: location.mapping_id.value,
            address: location.address.value,
            lines: location
                .lines
                .iter()
                .map(|field| crate::prost_impls::Line::from(field.value))
                .collect(),
            is_folded: location.is_folded.value,
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<Location> for crate::prost_impls::Location {
    fn from(location: Location) -> Self {
        Self::from(&location)
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<crate::prost_impls::Location> for Location {
    fn from(location: crate::prost_impls::Location) -> Self {
        Self {
            id: location.id.into(),
            mapping_id: location.mapping_id.into(),
            address: location.address.into(),
            lines: location
                .lines
                .into_iter()
                .map(|line| Field::from(Line::from(line)))
                .collect(),
            is_folded: location.is_folded.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prost_impls;
    use prost::Message as _;

    #[track_caller]
    fn test(location: &Location) {
        let prost_location = prost_impls::Location::from(location);

        let buffer = location.encode_to_vec().unwrap();
        let roundtrip = prost_impls::Location::decode(buffer.as_slice()).unwrap();
        assert_eq!(prost_location, roundtrip);

        let buffer2 = prost_location.encode_to_vec();
        assert_eq!(buffer, buffer2);
        assert_eq!(&Location::decode(&buffer2).unwrap(), location);
    }

    #[test]
    fn basic() {
        let location = Location {
            lines: vec![Field::from(Line {
                function_id: Field::from(1),
                line: Field::default(),
            })],
            ..Default::default()
        };
        test(&location);
    }

    #[test]
    fn default_lines_are_kept() {
        let location = Location {
            id: Field::from(3),
            lines: vec![Field::default(), Field::default()],
            ..Default::default()
        };
        let buffer = location.encode_to_vec().unwrap();
        assert_eq!(buffer, [0x08, 0x03, 0x22, 0x00, 0x22, 0x00]);
        assert_eq!(Location::decode(&buffer).unwrap(), location);
    }

    #[test]
    fn inlined_lines_keep_order() {
        let lines = [(10, 100), (11, -1), (12, 300)];
        let location = Location {
            id: Field::from(1),
            address: Field::from(0x7fff_0000_1234),
            lines: lines
                .iter()
                .map(|&(function_id, line)| {
                    Field::from(Line {
                        function_id: Field::from(function_id),
                        line: Field::from(line),
                    })
                })
                .collect(),
            is_folded: Field::from(true),
            ..Default::default()
        };
        test(&location);
    }

    #[test]
    fn roundtrip() {
        bolero::check!().with_type::<Location>().for_each(test);
    }
}
