use serde::Serialize;
use std::collections::HashSet;

use crate::types::{WaveKey, WaveRecord};

/// Ordered, duplicate-free view of every wave the session has observed.
///
/// Insertion order is first-arrival order: the position of a record is fixed
/// by whichever path delivered it first, and later sightings of the same key
/// (live event, refetch, receipt) are ignored. A merged batch never reorders
/// existing entries; its unseen records append in batch order.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct WaveCollection {
    records: Vec<WaveRecord>,
    #[serde(skip)]
    seen: HashSet<WaveKey>,
}

impl WaveCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record` unless its key is already present. Returns whether
    /// the record was inserted.
    pub fn insert(&mut self, record: WaveRecord) -> bool {
        if !self.seen.insert(record.key()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Merges a fetched batch, keeping first-arrival order. Returns the
    /// number of records inserted.
    pub fn merge<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = WaveRecord>,
    {
        batch.into_iter().filter(|record| self.insert(record.clone())).count()
    }

    pub fn contains(&self, key: &WaveKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in first-arrival order.
    pub fn records(&self) -> &[WaveRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaveRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a WaveCollection {
    type Item = &'a WaveRecord;
    type IntoIter = std::slice::Iter<'a, WaveRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
