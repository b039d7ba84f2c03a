// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod ingest;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::config::AggregatorConfig;
pub use crate::ingest::types::{CanonicalRecord, ContentKind, SourceDescriptor};
pub use crate::ingest::Aggregator;
pub use crate::store::{run_and_store, MemoryStore, RecordStore};
