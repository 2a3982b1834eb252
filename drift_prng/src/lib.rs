// Deterministic, portable pseudo-random number generator.
//
// Implements mulberry32: a single 32-bit state advanced by a Weyl increment
// and scrambled with two multiply-xorshift rounds. The state is tiny, the
// output is fast, and every operation is plain wrapping integer arithmetic, so
// the same seed yields the same stream on every platform.
//
// `drift_music` threads values from this generator through
// `ConstraintEngine::process`, `apply_gravity` and
// `PhraseMemory::apply_variation` as explicit `rand` arguments. Recording the
// seed is therefore enough to replay a whole session note for note.
//
// **Critical constraint: determinism.** `next_u32` must produce identical
// output given the same prior state, regardless of platform, compiler
// version, or optimization level. Floating point is only used to scale the
// finished integer into `[0, 1)`.

use serde::{Deserialize, Serialize};

/// Weyl-sequence increment added to the state on every draw.
const INCREMENT: u32 = 0x6d2b_79f5;

/// 2^32 as a float, the divisor that maps a `u32` into `[0, 1)`.
const U32_RANGE: f64 = 4_294_967_296.0;

/// Mulberry32 PRNG used for every random decision in the pipeline.
///
/// Each session (or each test) owns its own `DriftRng`, seeded
/// deterministically, so two runs with the same seed and the same gesture
/// produce the same notes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftRng {
    state: u32,
}

impl DriftRng {
    /// Create a new generator from a 32-bit seed.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Create a generator from a wide seed by folding the high half into
    /// the low half. Convenient for CLI seeds and timestamps.
    pub fn from_u64(seed: u64) -> Self {
        Self::new((seed ^ (seed >> 32)) as u32)
    }

    /// Generate the next `u32` in the sequence.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(INCREMENT);
        let s = self.state;
        let mut t = (s ^ (s >> 15)).wrapping_mul(1 | s);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        t ^ (t >> 14)
    }

    /// Generate a uniform `f64` in [0, 1).
    ///
    /// The full 32-bit output is divided by 2^32, so 1.0 is never reached.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / U32_RANGE
    }
}
