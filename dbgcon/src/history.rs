//! History Store
//!
//! Append-only sequence of every `Record` received during the session, in
//! arrival order. It is owned by the presentation loop and never shared
//! across threads, so it carries no locking.

use crate::record::Record;

#[derive(Debug, Default)]
pub struct HistoryStore {
    records: Vec<Record>,
    count: usize,
}

impl HistoryStore {
    pub fn new() -> HistoryStore {
        HistoryStore::default()
    }

    /// Appends `record` at the end and returns its index.
    pub fn append(&mut self, record: Record) -> usize {
        self.records.push(record);
        self.count += 1;
        self.count - 1
    }

    /// Empties the store and resets the counter. The only way it shrinks.
    pub fn clear(&mut self) {
        self.records.clear();
        self.count = 0;
    }

    /// Read-only view of the current contents, in arrival order.
    pub fn snapshot(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Number of records appended since startup or the last `clear`.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a HistoryStore {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
