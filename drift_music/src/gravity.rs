// Harmonic gravity: weighted selection of one note from the candidates.
//
// Every pitch class has a fixed pull toward stability (root strongest, minor
// 2nd weakest). `gravity_strength` blends between uniform weighting (0.0) and
// the full gravity table (1.0); the blended weights are normalized and sampled
// by inverse CDF against a caller-supplied `rand`. Nothing here draws its own
// randomness: a fixed `rand` sequence always selects the same notes, which is
// what makes sessions replayable (see `drift_prng`).

use crate::pitch::{clamp_note, relative_pitch_class};
use serde::{Deserialize, Serialize};

/// Weight used for any pitch class missing from the table.
pub const MIN_GRAVITY_WEIGHT: f64 = 0.1;

/// Gravity weight per pitch class relative to the root, indexed by pitch
/// class.
pub const GRAVITY_WEIGHTS: [f64; 12] = [
    1.0,  // root
    0.1,  // minor 2nd
    0.35, // major 2nd
    0.5,  // minor 3rd
    0.55, // major 3rd
    0.6,  // perfect 4th
    0.15, // tritone
    0.8,  // perfect 5th
    0.25, // minor 6th
    0.4,  // major 6th
    0.3,  // minor 7th
    0.2,  // major 7th
];

/// Gravity parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityConfig {
    /// Root the weights are measured from.
    pub root_note: i32,
    /// 0.0 = uniform choice, 1.0 = full pull toward stable tones. Clamped to
    /// `[0, 1]` at use.
    pub gravity_strength: f64,
}

impl Default for GravityConfig {
    fn default() -> Self {
        GravityConfig {
            root_note: 60,
            gravity_strength: 0.6,
        }
    }
}

/// Partial update for `GravityConfig`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityPatch {
    pub root_note: Option<i32>,
    pub gravity_strength: Option<f64>,
}

impl GravityConfig {
    pub fn merged(&self, patch: &GravityPatch) -> Self {
        GravityConfig {
            root_note: patch.root_note.unwrap_or(self.root_note),
            gravity_strength: patch.gravity_strength.unwrap_or(self.gravity_strength),
        }
    }
}

/// A candidate together with its raw gravity weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedNote {
    pub note: u8,
    pub weight: f64,
}

/// Gravity weight of `note` relative to `root`.
pub fn gravity_weight(note: i32, root: i32) -> f64 {
    GRAVITY_WEIGHTS
        .get(relative_pitch_class(note, root) as usize)
        .copied()
        .unwrap_or(MIN_GRAVITY_WEIGHT)
}

/// Select one note from `candidates`.
///
/// Empty input falls back to the configured root (clamped into the MIDI
/// range); a single candidate is returned unchanged. `rand` is expected in
/// `[0, 1)` and is clamped into it.
pub fn apply_gravity(candidates: &[u8], config: &GravityConfig, rand: f64) -> u8 {
    match candidates {
        [] => return clamp_note(config.root_note),
        [only] => return *only,
        _ => {}
    }

    let strength = if config.gravity_strength.is_nan() {
        0.0
    } else {
        config.gravity_strength.clamp(0.0, 1.0)
    };
    let weights: Vec<f64> = candidates
        .iter()
        .map(|&note| 1.0 - strength + strength * gravity_weight(i32::from(note), config.root_note))
        .collect();
    let total: f64 = weights.iter().sum();

    let r = if rand.is_nan() {
        0.0
    } else {
        rand.clamp(0.0, 1.0 - f64::EPSILON)
    };
    let mut cumulative = 0.0;
    for (&note, &weight) in candidates.iter().zip(&weights) {
        cumulative += weight / total;
        if r < cumulative {
            return note;
        }
    }
    // Rounding left the cumulative sum a hair under 1.
    candidates[candidates.len() - 1]
}

/// Candidates with their gravity weights, heaviest first. Diagnostic only;
/// ties keep candidate order.
pub fn rank_by_gravity(candidates: &[u8], root: i32) -> Vec<RankedNote> {
    let mut ranked: Vec<RankedNote> = candidates
        .iter()
        .map(|&note| RankedNote {
            note,
            weight: gravity_weight(i32::from(note), root),
        })
        .collect();
    ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    ranked
}
