// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{
    impl_embedded_message, DecodeError, EncodeError, Field, Message, RawField, Writer, OPT_ZERO,
};

/// Represents a function in a profile.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "bolero"),
    derive(bolero::generator::TypeGenerator)
)]
pub struct Function {
    /// Unique nonzero id for the function.
    pub id: Field<u64, 1, OPT_ZERO>,
    /// Name of the function, in human-readable form if available.
    pub name: Field<i64, 2, OPT_ZERO>,
    /// Name of the function, as identified by the system. For instance,
    /// it can be a C++ mangled name.
    pub system_name: Field<i64, 3, OPT_ZERO>,
    /// Source file containing the function.
    pub filename: Field<i64, 4, OPT_ZERO>,
    /// Line number in source file.
    pub start_line: Field<i64, 5, OPT_ZERO>,
}

impl Function {
    fn fields_proto_len(&self) -> u64 {
        self.id.proto_len()
            + self.name.proto_len()
            + self.system_name.proto_len()
            + self.filename.proto_len()
            + self.start_line.proto_len()
    }

    fn encode_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.id.encode(writer)?;
        self.name.encode(writer)?;
        self.system_name.encode(writer)?;
        self.filename.encode(writer)?;
        self.start_line.encode(writer)
    }
}

impl_embedded_message!(Function);

impl Message for Function {
    fn merge_field(&mut self, field: RawField<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.id.merge(field),
            2 => self.name.merge(field),
            3 => self.system_name.merge(field),
            4 => self.filename.merge(field),
            5 => self.start_line.merge(field),
            _ => field.skip("Function"),
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<Function> for crate::prost_impls::Function {
    fn from(function: Function) -> Self {
        Self::from(&function)
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<&Function> for crate::prost_impls::Function {
    fn from(function: &Function) -> Self {
        Self {
            id: function.id.value,
            name: function.name.value,
            system_name: function.system_name.value,
            filename: function.filename.value,
            start_line: function.start_line.value,
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<crate::prost_impls::Function> for Function {
    fn from(function: crate::prost_impls::Function) -> Self {
        Self {
            id: function.id.into(),
            name: function.name.into(),
            system_name: function.system_name.into(),
            filename: function.filename.into(),
            start_line: function.start_line.into(),
        }
    }
}
