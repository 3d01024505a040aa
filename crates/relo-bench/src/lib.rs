//! Workload generators for the relo benchmarks.
//!
//! - [`Payload`]: a 64-byte bitwise-relocatable element.
//! - [`Observed`]: the same payload with an observable move constructor,
//!   to measure the move-construct path against the memmove path.
//! - [`random_positions`]: deterministic insertion positions via seed.

#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use relo_buffer::{impl_relocate, Relocate};

/// Plain 64-byte element.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Payload(pub [u64; 8]);

impl Payload {
    /// A payload with every word set to `v`.
    pub fn new(v: u64) -> Self {
        Payload([v; 8])
    }
}

impl_relocate!(Payload);

/// A [`Payload`] whose moves run a move constructor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observed(pub Payload);

#[allow(unsafe_code)]
// SAFETY: classified as move-constructed; never byte-copied.
unsafe impl Relocate for Observed {
    const OBSERVES_MOVES: bool = true;

    fn move_construct(src: &mut Self) -> Self {
        Observed(src.0)
    }
}

/// `count` insertion positions for a sequence growing from `start` by one
/// element per insertion, drawn from a seeded ChaCha8 stream.
pub fn random_positions(seed: u64, start: usize, count: usize) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|i| (rng.next_u64() % (start + i + 1) as u64) as usize)
        .collect()
}
