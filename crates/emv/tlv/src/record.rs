//! Decoded TLV records and collections

use std::collections::HashMap;
use std::ops::Deref;

use bytes::Bytes;

use crate::{Tag, TlvError, encode};

/// A single primitive TLV record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvRecord {
    tag: Tag,
    value: Bytes,
}

impl TlvRecord {
    /// Create a record; the length is always derived from the value
    pub fn new(tag: Tag, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Record tag
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    /// Raw value bytes
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Value as a cheaply cloneable buffer
    pub fn value_bytes(&self) -> Bytes {
        self.value.clone()
    }

    /// Value length in bytes
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether the value is empty
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Value rendered as uppercase hex
    pub fn value_hex(&self) -> String {
        hex::encode_upper(&self.value)
    }

    /// Encode this record to its wire form
    pub fn encode(&self) -> Result<Bytes, TlvError> {
        encode(self)
    }
}

/// Ordered sequence of decoded records, duplicates preserved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvList(Vec<TlvRecord>);

impl TlvList {
    /// Create an empty list
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a record
    pub fn push(&mut self, record: TlvRecord) {
        self.0.push(record);
    }

    /// First record carrying `tag`
    pub fn find(&self, tag: Tag) -> Option<&TlvRecord> {
        self.0.iter().find(|r| r.tag == tag)
    }

    /// Keyed view of the list, the last occurrence of a tag wins
    pub fn to_map(&self) -> TlvMap {
        self.0.iter().cloned().collect()
    }

    /// Consume the list and return the records
    pub fn into_inner(self) -> Vec<TlvRecord> {
        self.0
    }
}

impl Deref for TlvList {
    type Target = [TlvRecord];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for TlvList {
    type Item = TlvRecord;
    type IntoIter = std::vec::IntoIter<TlvRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TlvList {
    type Item = &'a TlvRecord;
    type IntoIter = std::slice::Iter<'a, TlvRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<TlvRecord> for TlvList {
    fn from_iter<T: IntoIterator<Item = TlvRecord>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Tag-keyed view of decoded records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvMap(HashMap<Tag, TlvRecord>);

impl TlvMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any earlier record with the same tag
    pub fn insert(&mut self, record: TlvRecord) -> Option<TlvRecord> {
        self.0.insert(record.tag, record)
    }

    /// Merge `other` into this map, its records win on conflict
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Record for `tag`
    pub fn get(&self, tag: Tag) -> Option<&TlvRecord> {
        self.0.get(&tag)
    }

    /// Value bytes for `tag`
    pub fn value(&self, tag: Tag) -> Option<&[u8]> {
        self.get(tag).map(TlvRecord::value)
    }

    /// Value for `tag` as uppercase hex
    pub fn value_hex(&self, tag: Tag) -> Option<String> {
        self.get(tag).map(TlvRecord::value_hex)
    }

    /// First non-empty value among `tags`, in the order given
    pub fn first_value(&self, tags: &[Tag]) -> Option<&[u8]> {
        tags.iter()
            .filter_map(|tag| self.value(*tag))
            .find(|v| !v.is_empty())
    }

    /// Whether a record for `tag` is present
    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains_key(&tag)
    }

    /// Number of distinct tags
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the records in unspecified order
    pub fn records(&self) -> impl Iterator<Item = &TlvRecord> {
        self.0.values()
    }
}

impl FromIterator<TlvRecord> for TlvMap {
    fn from_iter<T: IntoIterator<Item = TlvRecord>>(iter: T) -> Self {
        Self(iter.into_iter().map(|r| (r.tag, r)).collect())
    }
}
