// src/ingest/dedup.rs
//! Incremental diff against the ids reported by the previous poll.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::ingest::types::{seq_id, RawRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    /// Records to report for this poll.
    pub entries: Vec<RawRecord>,
    /// How many of `entries` were genuinely new (0 under fallback when nothing had an id).
    pub new_count: usize,
    /// True when no record carried a usable id and everything was passed through.
    pub fallback: bool,
}

/// Pure part of the diff: (ids present now, records whose id is usable and not in `prior`).
pub fn diff(records: &[RawRecord], prior: &HashSet<String>) -> (HashSet<String>, Vec<RawRecord>) {
    let mut current = HashSet::with_capacity(records.len());
    let mut fresh = Vec::new();
    for r in records {
        if let Some(id) = seq_id(r) {
            if !prior.contains(&id) {
                fresh.push(r.clone());
            }
            current.insert(id);
        }
    }
    (current, fresh)
}

/// Ids reported as of the last completed poll. Each `apply` replaces the set wholesale.
#[derive(Debug, Default)]
pub struct SeenStore {
    ids: Mutex<HashSet<String>>,
}

impl SeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read, diff and replace under one lock.
    ///
    /// If the replaced set ends up empty (no record had a usable `seq_id`), the
    /// full record set is returned unfiltered.
    pub fn apply(&self, records: Vec<RawRecord>) -> DedupOutcome {
        let mut seen = self.lock();
        let (current, fresh) = diff(&records, &seen);
        *seen = current;

        if seen.is_empty() {
            DedupOutcome {
                entries: records,
                new_count: 0,
                fallback: true,
            }
        } else {
            DedupOutcome {
                new_count: fresh.len(),
                entries: fresh,
                fallback: false,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    pub fn snapshot(&self) -> HashSet<String> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn recs(v: Value) -> Vec<RawRecord> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|x| x.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn first_poll_reports_everything_identified() {
        let store = SeenStore::new();
        let out = store.apply(recs(json!([
            {"seq_id": "A", "symbol": "X"},
            {"seq_id": "B", "symbol": "Y"}
        ])));
        assert_eq!(out.entries.len(), 2);
        assert_eq!(out.new_count, 2);
        assert!(!out.fallback);
        let expected: HashSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        assert_eq!(store.snapshot(), expected);
    }

    #[test]
    fn unidentified_records_are_not_reported_when_others_have_ids() {
        let store = SeenStore::new();
        let out = store.apply(recs(json!([
            {"seq_id": "A"},
            {"seq_id": null, "symbol": "N"},
            {"symbol": "M"}
        ])));
        assert_eq!(out.entries.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn no_usable_ids_falls_back_to_full_set() {
        let store = SeenStore::new();
        store.apply(recs(json!([{"seq_id": "A"}])));

        let out = store.apply(recs(json!([{"symbol": "X"}, {"seq_id": null}])));
        assert!(out.fallback);
        assert_eq!(out.entries.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_ids_within_a_poll_are_both_reported() {
        let (current, fresh) = diff(
            &recs(json!([{"seq_id": "A", "v": 1}, {"seq_id": "A", "v": 2}])),
            &HashSet::new(),
        );
        assert_eq!(current.len(), 1);
        assert_eq!(fresh.len(), 2);
    }
}
