// src/store.rs
//! Persistence collaborator seam.
//!
//! The engine only reads a key snapshot before a run and hands the batch
//! over afterwards. Rejecting keys that slipped through a stale snapshot
//! (two runs in flight) is the store's job, not the engine's.
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::ingest::types::{CanonicalRecord, ContentKind};
use crate::ingest::url_norm::{normalize_url, EMPTY_KEY};
use crate::ingest::Aggregator;

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Dedup-key values already persisted for `kind` (raw or normalized).
    async fn existing_keys(&self, kind: ContentKind) -> Result<Vec<String>>;

    /// Persist a batch; returns how many records were actually inserted.
    async fn insert_batch(&self, kind: ContentKind, records: &[CanonicalRecord]) -> Result<usize>;
}

/// In-process store with a unique index on the normalized dedup key.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<ContentKind, Table>>,
}

#[derive(Default)]
struct Table {
    keys: HashSet<String>,
    rows: Vec<CanonicalRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate keys, as if rows had been written by an earlier run.
    pub fn with_keys<I, S>(self, kind: ContentKind, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Ok(mut guard) = self.inner.lock() {
            let table = guard.entry(kind).or_default();
            table
                .keys
                .extend(keys.into_iter().map(|k| normalize_url(k.as_ref())));
        }
        self
    }

    pub fn rows(&self, kind: ContentKind) -> Vec<CanonicalRecord> {
        self.inner
            .lock()
            .map(|g| g.get(&kind).map(|t| t.rows.clone()).unwrap_or_default())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn existing_keys(&self, kind: ContentKind) -> Result<Vec<String>> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(guard
            .get(&kind)
            .map(|t| t.keys.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_batch(&self, kind: ContentKind, records: &[CanonicalRecord]) -> Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        let table = guard.entry(kind).or_default();

        let mut inserted = 0usize;
        for rec in records {
            if rec.kind() != kind {
                anyhow::bail!("record of kind {} in a {} batch", rec.kind(), kind);
            }
            let key = normalize_url(rec.dedup_key());
            if key == EMPTY_KEY || !table.keys.insert(key) {
                tracing::debug!(target: "ingest", key = rec.dedup_key(), "store rejected duplicate key");
                continue;
            }
            table.rows.push(rec.clone());
            inserted += 1;
        }
        Ok(inserted)
    }
}

/// Result of one aggregate-then-persist cycle.
#[derive(Debug, Clone)]
pub struct StoredRun {
    pub records: Vec<CanonicalRecord>,
    pub inserted: usize,
}

/// Seed the dedup set from the store, aggregate, hand the batch off.
pub async fn run_and_store(
    aggregator: &Aggregator,
    store: &dyn RecordStore,
    kind: ContentKind,
    total_limit: usize,
) -> Result<StoredRun> {
    let existing = store.existing_keys(kind).await?;
    let records = aggregator.aggregate(kind, total_limit, &existing).await;
    let inserted = if records.is_empty() {
        0
    } else {
        store.insert_batch(kind, &records).await?
    };
    tracing::info!(
        target: "ingest",
        %kind,
        aggregated = records.len(),
        inserted,
        "batch handed to store"
    );
    Ok(StoredRun { records, inserted })
}
