// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{varint, EncodeError, Tag, WireType, Writer};
use core::{fmt, hash};
use indexmap::IndexMap;

type FxIndexMap<K, V> = IndexMap<K, V, hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// The field number of `Profile.string_table`.
pub(crate) const STRING_TABLE_FIELD: u32 = 6;

/// A StringTable holds unique strings in insertion order; a string's index
/// is its position. The empty string is always at index 0.
///
/// Each entry caches its in-wire bytes (tag, length prefix, and UTF-8 data)
/// as it's inserted, so encoding the table is a sequence of copies. The empty
/// string is never written: it's implied by the format.
#[derive(Clone)]
pub struct StringTable {
    /// Maps each string to its encoded field bytes. The map's insertion order
    /// is the table order.
    entries: FxIndexMap<Box<str>, Box<[u8]>>,
    /// Sum of the lengths of the cached encodings.
    encoded_len: u64,
}

impl StringTable {
    pub fn new() -> Self {
        let mut entries = FxIndexMap::default();
        entries.insert(Box::from(""), Box::default());
        Self {
            entries,
            encoded_len: 0,
        }
    }

    /// Returns the index of `s`, adding it to the end of the table if it's
    /// new. The empty string is always 0.
    pub fn dedup(&mut self, s: &str) -> i64 {
        if s.is_empty() {
            return 0;
        }
        if let Some(index) = self.entries.get_index_of(s) {
            return index as i64;
        }
        let encoded = encode_entry(s);
        self.encoded_len += encoded.len() as u64;
        let (index, _) = self.entries.insert_full(Box::from(s), encoded);
        index as i64
    }

    /// Returns the string at `index`, if there is one.
    pub fn get(&self, index: i64) -> Option<&str> {
        let index = usize::try_from(index).ok()?;
        self.entries.get_index(index).map(|(s, _)| &**s)
    }

    /// The number of strings, including the empty string.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table only holds the empty string.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.entries.keys().map(|s| &**s)
    }

    /// The number of bytes [StringTable::encode] writes.
    #[inline]
    pub fn encoded_len(&self) -> u64 {
        self.encoded_len
    }

    /// Writes every non-empty string as its own `string_table` field, in
    /// table order.
    pub fn encode(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        for encoded in self.entries.values() {
            writer.put_slice(encoded)?;
        }
        Ok(())
    }
}

fn encode_entry(s: &str) -> Box<[u8]> {
    let len = s.len() as u64;
    let tag = Tag::new(STRING_TABLE_FIELD, WireType::LengthDelimited);
    let mut encoded =
        Vec::with_capacity((tag.proto_len() + varint::proto_len(len) + len) as usize);
    encoded.extend(varint::LongBits::from_u64(u64::from(tag.raw())).bytes());
    encoded.extend(varint::LongBits::from_u64(len).bytes());
    encoded.extend_from_slice(s.as_bytes());
    encoded.into_boxed_slice()
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for StringTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries.keys().eq(other.entries.keys())
    }
}

impl Eq for StringTable {}

impl fmt::Debug for StringTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a> Extend<&'a str> for StringTable {
    fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
        for s in iter {
            self.dedup(s);
        }
    }
}

impl<'a> FromIterator<&'a str> for StringTable {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<'a> From<&[&'a str]> for StringTable {
    fn from(strings: &[&'a str]) -> Self {
        strings.iter().copied().collect()
    }
}

impl<'a, const N: usize> From<[&'a str; N]> for StringTable {
    fn from(strings: [&'a str; N]) -> Self {
        strings.into_iter().collect()
    }
}

impl From<Vec<String>> for StringTable {
    fn from(strings: Vec<String>) -> Self {
        strings.iter().map(String::as_str).collect()
    }
}
