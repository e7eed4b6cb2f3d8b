// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{
    impl_embedded_message, DecodeError, EncodeError, Field, Message, RawField, Writer, OPT_ZERO,
};

/// Label includes additional context for this sample. It can include things
/// like a thread id, allocation size, etc.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "bolero"),
    derive(bolero::generator::TypeGenerator)
)]
pub struct Label {
    /// An annotation for a sample, e.g. "allocation_size".
    pub key: Field<i64, 1, OPT_ZERO>,
    /// At most, one of the str and num should be used.
    pub str: Field<i64, 2, OPT_ZERO>,
    /// At most, one of the str and num should be used.
    pub num: Field<i64, 3, OPT_ZERO>,
    /// Should only be present when num is present.
    /// Specifies the units of num.
    /// Use arbitrary string (for example, "requests") as a custom count unit.
    /// If no unit is specified, consumer may apply heuristic to deduce it.
    pub num_unit: Field<i64, 4, OPT_ZERO>,
}

impl Label {
    fn fields_proto_len(&self) -> u64 {
        self.key.proto_len()
            + self.str.proto_len()
            + self.num.proto_len()
            + self.num_unit.proto_len()
    }

    fn encode_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.key.encode(writer)?;
        self.str.encode(writer)?;
        self.num.encode(writer)?;
        self.num_unit.encode(writer)
    }
}

impl_embedded_message!(Label);

impl Message for Label {
    fn merge_field(&mut self, field: RawField<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.key.merge(field),
            2 => self.str.merge(field),
            3 => self.num.merge(field),
            4 => self.num_unit.merge(field),
            _ => field.skip("Label"),
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<Label> for crate::prost_impls::Label {
    fn from(label: Label) -> Self {
        Self::from(&label)
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<&Label> for crate::prost_impls::Label {
    fn from(label: &Label) -> Self {
        // If the prost file is regenerated, this may pick up new members.
        #[allow(clippy::needless_update)]
        Self {
            key: label.key.value,
            str: label.str.value,
            num: label.num.value,
            num_unit: label.num_unit.value,
            ..Self::default()
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<crate::prost_impls::Label> for Label {
    fn from(label: crate::prost_impls::Label) -> Self {
        Self {
            key: label.key.into(),
            str: label.str.into(),
            num: label.num.into(),
            num_unit: label.num_unit.into(),
        }
    }
}
