// src/ingest/shuffle.rs
//! Optional mixing step applied after aggregation (e.g. so one channel
//! does not dominate the top of a video listing). Never part of `run`.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffle in place. `Some(seed)` is reproducible; `None` uses the thread RNG.
pub fn shuffle_records<T>(items: &mut [T], seed: Option<u64>) {
    match seed {
        Some(seed) => items.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => items.shuffle(&mut rand::rng()),
    }
}
