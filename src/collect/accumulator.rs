use crate::types::PostRecord;
use std::collections::HashSet;

/// Insertion-ordered, first-write-wins store of posts keyed by id.
///
/// Lives for exactly one collection run; nothing is ever removed or updated.
#[derive(Debug, Default)]
pub struct Accumulator {
    seen: HashSet<String>,
    records: Vec<PostRecord>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert every record whose id is not present yet. Returns how many were
    /// newly added.
    pub fn merge(&mut self, records: impl IntoIterator<Item = PostRecord>) -> usize {
        let before = self.records.len();
        for record in records {
            if self.seen.insert(record.id.clone()) {
                self.records.push(record);
            }
        }
        self.records.len() - before
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Records in first-seen order.
    pub fn values(&self) -> &[PostRecord] {
        &self.records
    }

    /// Consume the store, keeping at most the first `n` records.
    pub fn into_top(mut self, n: usize) -> Vec<PostRecord> {
        self.records.truncate(n);
        self.records
    }
}
