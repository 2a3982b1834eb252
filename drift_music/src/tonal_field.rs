// Continuous tonal space: pointer position to ranked candidate notes.
//
// The horizontal axis controls harmonic breadth. Pitch classes are taken in
// order of stability relative to the root, so a pointer at the left edge
// offers only the root and fifth while the right edge opens up the full
// chromatic set. The vertical axis controls register: it slides continuously
// between `base_octave` and `base_octave + octave_range`, and candidates are
// generated for the octave at that point and the one above it.
//
// Candidates are ordered by distance from the register center, so the first
// entry is the nearest playable note, not the most stable one. Stability
// only decides which pitch classes are admitted. Selection among the
// candidates happens in gravity.rs.
//
// See also: `engine.rs`, which calls `candidate_notes` as step one of the
// pipeline.

use crate::pitch::{MIDI_MAX, pitch_class};
use serde::{Deserialize, Serialize};

/// Pitch classes relative to the root, from most stable (root) to most tense
/// (minor 2nd).
pub const STABILITY_ORDER: [u8; 12] = [0, 7, 5, 4, 3, 9, 2, 10, 8, 6, 11, 1];

/// A normalized pointer position. Both axes are clamped to `[0, 1]` on
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub nx: f64,
    pub ny: f64,
}

impl Position {
    pub fn new(nx: f64, ny: f64) -> Self {
        Position {
            nx: clamp_unit(nx),
            ny: clamp_unit(ny),
        }
    }
}

/// Clamp to `[0, 1]`. NaN collapses to 0 rather than propagating.
pub(crate) fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Tonal field parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TonalFieldConfig {
    /// MIDI root of the field (60 = C4). Not range-checked; generated notes
    /// outside the MIDI range are dropped instead.
    pub root_note: i32,
    /// Lowest octave offset from the root.
    pub base_octave: i32,
    /// Number of octaves the vertical axis spans.
    pub octave_range: u32,
}

impl Default for TonalFieldConfig {
    fn default() -> Self {
        TonalFieldConfig {
            root_note: 60,
            base_octave: 0,
            octave_range: 3,
        }
    }
}

/// Partial update for `TonalFieldConfig`. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TonalFieldPatch {
    pub root_note: Option<i32>,
    pub base_octave: Option<i32>,
    pub octave_range: Option<u32>,
}

impl TonalFieldConfig {
    /// Return a copy with every `Some` field of `patch` applied.
    pub fn merged(&self, patch: &TonalFieldPatch) -> Self {
        TonalFieldConfig {
            root_note: patch.root_note.unwrap_or(self.root_note),
            base_octave: patch.base_octave.unwrap_or(self.base_octave),
            octave_range: patch.octave_range.unwrap_or(self.octave_range),
        }
    }
}

/// The stability ordering of pitch classes, root first.
pub fn stability_order() -> &'static [u8; 12] {
    &STABILITY_ORDER
}

/// Stability score of a pitch class: 0.0 for the root, 1.0 for the minor
/// 2nd. Used for visual overlays and ranking, never for selection.
pub fn pitch_class_stability(pc: i32) -> f64 {
    let pc = pitch_class(pc);
    let index = STABILITY_ORDER
        .iter()
        .position(|&p| p == pc)
        .unwrap_or(STABILITY_ORDER.len() - 1);
    index as f64 / (STABILITY_ORDER.len() - 1) as f64
}

/// Map a pointer position to candidate MIDI notes, nearest-in-register first.
///
/// Out-of-range coordinates are clamped. The result is empty only when the
/// whole register window lies outside the MIDI range.
pub fn candidate_notes(nx: f64, ny: f64, config: &TonalFieldConfig) -> Vec<u8> {
    let pos = Position::new(nx, ny);

    // 2 pitch classes at the left edge, 12 at the right.
    let count = (2.0 + pos.nx * 10.0).round() as usize;
    let active = &STABILITY_ORDER[..count.clamp(2, STABILITY_ORDER.len())];

    // Register arithmetic is widened: any i32 root and u32 range must give
    // an empty window, never an overflow.
    let base_octave = i64::from(config.base_octave);
    let top_octave = base_octave + i64::from(config.octave_range);
    let octave_center = f64::from(config.base_octave) + pos.ny * f64::from(config.octave_range);
    let octave_low = octave_center.floor() as i64;
    let octave_high = (octave_low + 1).min(top_octave);

    let mut candidates: Vec<u8> = Vec::with_capacity(active.len() * 2);
    for octave in octave_low..=octave_high {
        for &pc in active {
            let note = i64::from(config.root_note) + octave * 12 + i64::from(pc);
            if (0..=i64::from(MIDI_MAX)).contains(&note) {
                candidates.push(note as u8);
            }
        }
    }

    let center = f64::from(config.root_note) + octave_center * 12.0;
    // Stable sort: equidistant notes keep stability order.
    candidates.sort_by(|&a, &b| {
        let da = (f64::from(a) - center).abs();
        let db = (f64::from(b) - center).abs();
        da.total_cmp(&db)
    });
    candidates
}

/// Distance between two positions in the field. The horizontal axis is
/// weighted double because it changes harmonic content, not just register.
pub fn tonal_distance(a: Position, b: Position) -> f64 {
    let dx = a.nx - b.nx;
    let dy = a.ny - b.ny;
    (dx * dx * 4.0 + dy * dy).sqrt()
}
