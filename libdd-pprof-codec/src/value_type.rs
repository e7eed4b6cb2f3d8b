// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{
    impl_embedded_message, DecodeError, EncodeError, Field, Message, RawField, Writer, OPT_ZERO,
};

/// ValueType describes the semantics and measurement units of a value.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "bolero"),
    derive(bolero::generator::TypeGenerator)
)]
pub struct ValueType {
    /// Index into the string table, e.g. "cpu-time".
    pub r#type: Field<i64, 1, OPT_ZERO>,
    /// Index into the string table, e.g. "nanoseconds".
    pub unit: Field<i64, 2, OPT_ZERO>,
}

impl ValueType {
    fn fields_proto_len(&self) -> u64 {
        self.r#type.proto_len() + self.unit.proto_len()
    }

    fn encode_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.r#type.encode(writer)?;
        self.unit.encode(writer)
    }
}

impl_embedded_message!(ValueType);

impl Message for ValueType {
    fn merge_field(&mut self, field: RawField<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.r#type.merge(field),
            2 => self.unit.merge(field),
            _ => field.skip("ValueType"),
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<ValueType> for crate::prost_impls::ValueType {
    fn from(value: ValueType) -> Self {
        Self::from(&value)
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<&ValueType> for crate::prost_impls::ValueType {
    fn from(value: &ValueType) -> Self {
        // If the prost file is regenerated, this may pick up new members.
        #[allow(clippy::needless_update)]
        Self {
            r#type: value.r#type.value,
            unit: value.unit.value,
            ..Self::default()
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<crate::prost_impls::ValueType> for ValueType {
    fn from(value: crate::prost_impls::ValueType) -> Self {
        Self {
            r#type: value.r#type.into(),
            unit: value.unit.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prost_impls;
    use prost::Message as _;

    fn test(value_type: &ValueType) {
        let prost_value_type = prost_impls::ValueType::from(value_type);
        assert_eq!(value_type.r#type.value, prost_value_type.r#type);
        assert_eq!(value_type.unit.value, prost_value_type.unit);

        let buffer = value_type.encode_to_vec().unwrap();
        assert_eq!(buffer.len(), value_type.measured_len());
        let roundtrip = prost_impls::ValueType::decode(buffer.as_slice()).unwrap();
        assert_eq!(prost_value_type, roundtrip);

        let buffer2 = prost_value_type.encode_to_vec();
        assert_eq!(buffer, buffer2);
        assert_eq!(ValueType::decode(&buffer2).unwrap(), *value_type);
    }

    #[test]
    fn roundtrip() {
        bolero::check!().with_type::<ValueType>().for_each(test);
    }

    #[test]
    fn all_default_is_empty() {
        let value_type = ValueType::default();
        assert_eq!(value_type.measured_len(), 0);
        assert!(value_type.encode_to_vec().unwrap().is_empty());
        assert_eq!(ValueType::decode(&[]).unwrap(), value_type);
    }

    #[test]
    fn known_bytes() {
        let value_type = ValueType {
            r#type: Field::from(9),
            unit: Field::from(10),
        };
        assert_eq!(value_type.encode_to_vec().unwrap(), [0x08, 0x09, 0x10, 0x0a]);
    }

    #[test]
    fn unknown_fields_are_skipped() {
        // field 3 (varint) and field 4 (length-delimited) don't exist.
        let bytes = [0x18, 0x96, 0x01, 0x08, 0x02, 0x22, 0x01, 0xff, 0x10, 0x03];
        let value_type = ValueType::decode(&bytes).unwrap();
        assert_eq!(value_type.r#type.value, 2);
        assert_eq!(value_type.unit.value, 3);
    }
}
