// src/ingest/dedup.rs
//! Per-run dedup set keyed on normalized URLs.
//!
//! Seeded from the store snapshot the caller passes in, then grown as
//! records are accepted. Nothing survives the run; two runs in flight
//! with stale snapshots can both accept the same key, and the store's own
//! uniqueness constraint is what rejects the second insert.

use crate::ingest::types::CanonicalRecord;
use crate::ingest::url_norm::{normalize_url, EMPTY_KEY};
use std::collections::HashSet;

#[derive(Debug, Default, Clone)]
pub struct DedupSet {
    keys: HashSet<String>,
    seeded: usize,
}

impl DedupSet {
    /// Start a run from already-persisted identifiers (normalized here).
    pub fn new_run<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: HashSet<String> = existing
            .into_iter()
            .map(|k| normalize_url(k.as_ref()))
            .filter(|k| k != EMPTY_KEY)
            .collect();
        let seeded = keys.len();
        Self { keys, seeded }
    }

    /// Accept a raw key: `true` if it was new (and is now remembered).
    /// Empty keys are never accepted.
    pub fn try_accept_key(&mut self, raw_key: &str) -> bool {
        let key = normalize_url(raw_key);
        if key == EMPTY_KEY {
            return false;
        }
        self.keys.insert(key)
    }

    pub fn try_accept(&mut self, record: &CanonicalRecord) -> bool {
        self.try_accept_key(record.dedup_key())
    }

    pub fn contains(&self, raw_key: &str) -> bool {
        self.keys.contains(&normalize_url(raw_key))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys accepted during this run (excludes the seed).
    pub fn accepted_in_run(&self) -> usize {
        self.keys.len() - self.seeded
    }
}
