//! Owned result buffers staged on a background thread and handed to the host.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Platform identifier of a concrete item instance.
pub type ItemInstanceId = u64;

/// Platform identifier of an item definition.
pub type ItemDefId = i32;

/// One inventory record as reported by a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Item instance identifier. Serialized as a decimal string so hosts without
    /// 64-bit integers keep full precision.
    #[serde(with = "crate::util::serde::u64_string")]
    pub item_id: ItemInstanceId,
    /// Item definition (category) identifier.
    pub definition: ItemDefId,
    /// Quantity held.
    pub quantity: u16,
    /// Platform flags.
    pub flags: u16,
}

/// Fixed-length buffer whose size is decided once, at allocation.
///
/// Records cannot be appended after allocation; the only way to change the length
/// is [`ResultBuffer::truncate_filled`], which keeps a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultBuffer<T> {
    records: Box<[T]>,
}

impl<T: Default + Clone> ResultBuffer<T> {
    /// Allocate exactly `len` default-initialized records.
    #[must_use]
    pub fn allocate(len: usize) -> Self {
        Self {
            records: vec![T::default(); len].into_boxed_slice(),
        }
    }
}

impl<T> ResultBuffer<T> {
    /// An empty buffer.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            records: Box::default(),
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the buffer holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    /// Mutable destination for a fill call.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.records
    }

    /// Keep only the first `filled` records. Returns `None` if `filled` exceeds
    /// the allocated length.
    #[must_use]
    pub fn truncate_filled(self, filled: usize) -> Option<Self> {
        if filled > self.records.len() {
            return None;
        }
        let mut records = self.records.into_vec();
        records.truncate(filled);
        Some(Self {
            records: records.into_boxed_slice(),
        })
    }

    /// Consume into a `Vec`.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.records.into_vec()
    }
}

impl<T> Default for ResultBuffer<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Deref for ResultBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.records
    }
}

impl<T> From<Vec<T>> for ResultBuffer<T> {
    fn from(records: Vec<T>) -> Self {
        Self {
            records: records.into_boxed_slice(),
        }
    }
}

impl<T> IntoIterator for ResultBuffer<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_vec().into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ResultBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
