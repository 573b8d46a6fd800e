//! Per-instance PRNG seeding, shared by every filter and resampler.
//!
//! Each filter/resampler owns its `StdRng`; none of them touch
//! `rand::thread_rng()`, so two instances never interfere with each other's
//! draw sequence (SPEC_FULL.md §5).

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seed a `StdRng` from `seed`, or from the system clock if `None`.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);
            StdRng::seed_from_u64(nanos)
        }
    }
}
