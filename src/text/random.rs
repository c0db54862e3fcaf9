//! Deterministic pseudo-randomness seeded from strings.
//!
//! Everything that should replay identically (choice selection, text
//! variants) hashes a seed string built from the story id and the current
//! month, so the same save sees the same outcomes within a month. The
//! `random!` forms break determinism on purpose with a time-based seed
//! salted by per-process entropy.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Map a seed string to a float in `[0, 1)`.
///
/// Character values are squared and scaled by their position so that
/// `1salt2` differs from `2salt1`, then wrapped through a few primes.
pub(crate) fn random_from_string(seed: &str) -> f32 {
    if seed.is_empty() {
        return 0.5;
    }

    let mut hash: i32 = 0;
    for (index, character) in seed.chars().enumerate() {
        let value = character as i32;
        hash = hash.wrapping_add(value.wrapping_mul(value).wrapping_mul(index as i32));
    }

    let primed = (hash as f32) * 9343.0 * 12157.0 * 15307.0;
    let fraction = ((primed % 2953.0) + 2953.0) % 2953.0 / 2953.0;

    fraction.min(0.999_999)
}

/// Seeded integer in the inclusive range `[low, high]`.
pub(crate) fn random_range_int(low: i32, high: i32, seed: &str) -> i32 {
    let span = (high - low + 1) as f32;
    let value = low + (random_from_string(seed) * span) as i32;

    value.max(low).min(high)
}

/// Seeded chance of `numerator` in `denominator`.
pub(crate) fn random_chance(numerator: i32, denominator: i32, seed: &str) -> bool {
    if denominator <= 0 {
        return false;
    }
    if numerator > denominator {
        return true;
    }

    random_from_string(seed) < numerator as f32 / denominator as f32
}

/// Pick by cumulative weight bracket from a seeded roll.
///
/// Zero-weight candidates are never picked.
pub(crate) fn pick_weighted<'a, T>(items: &'a [T], weights: &[f32], seed: &str) -> Option<&'a T> {
    if items.is_empty() || items.len() != weights.len() {
        return None;
    }

    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let roll = random_from_string(seed) * total;

    let mut running = 0.0;
    for (item, weight) in items.iter().zip(weights.iter()) {
        running += weight;
        if *weight > 0.0 && running >= roll {
            return Some(item);
        }
    }

    items.last()
}

/// Seed for the deterministic random forms: stable per story and month.
///
/// `truly_random` swaps in a time-based seed that changes every call.
pub(crate) fn random_seed(story_id: &str, month: i32, truly_random: bool) -> String {
    if truly_random {
        truly_random_seed()
    } else {
        format!("randomReq{}{}", story_id, month)
    }
}

fn truly_random_seed() -> String {
    static SALT: OnceLock<u64> = OnceLock::new();
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let salt = *SALT.get_or_init(|| ChaCha8Rng::from_entropy().next_u64());

    // wall time alone may not change between two calls in one frame
    let ticks = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("{} {} {}", ticks, salt, count)
}
