// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::WireType;

#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum EncodeError {
    #[error("protobuf messages need to fit in 2 GiB and the message needs {len} bytes")]
    TooLarge { len: u64 },

    #[error("protobuf message needed {required} bytes at offset {offset}, only {available} available")]
    BufferTooSmall {
        offset: usize,
        required: usize,
        available: usize,
    },
}

/// Any of these means the input is not a valid encoding of the pprof schema.
/// Unknown field numbers are not errors; they are skipped.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum DecodeError {
    #[error("unsupported wire type {wire_type} at offset {offset}")]
    UnsupportedWireType { wire_type: u8, offset: usize },

    #[error("buffer truncated: needed {needed} bytes, only {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("varint is longer than 10 bytes")]
    VarintOverflow,

    #[error("invalid tag {tag}")]
    InvalidTag { tag: u64 },

    #[error("field {field} expected wire type {expected:?} but got {actual:?}")]
    WireTypeMismatch {
        field: u32,
        expected: WireType,
        actual: WireType,
    },

    #[error("string table entry is not valid UTF-8")]
    InvalidUtf8,
}
