// Phrase memory: remembers recent notes and varies repeated gestures.
//
// A bounded FIFO of played notes is summarized as its interval pattern
// (successive semitone differences). When a new gesture's pattern matches the
// stored one closely enough, `replay_count` rises and `apply_variation` shifts
// the next note by a small random amount that grows with the count,
// saturating after four repeats. On a novel gesture the count decays by one
// instead of resetting, so a single stray note does not wipe out a long
// repetition streak.
//
// Similarity is a positional exact-match ratio, not an edit distance: the
// same contour shifted by one step scores as unrelated.
//
// See also: `engine.rs`, which builds the hypothetical pattern for the
// incoming note and decides when to call `check_and_evolve`.

use crate::pitch::{MIDI_MAX, clamp_note, semitones};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of detected repeats at which variation reaches its full width.
const VARIATION_SATURATION: u32 = 4;

/// One remembered note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhraseEvent {
    pub note: u8,
    pub velocity: u8,
    /// Session time in milliseconds.
    pub timestamp: f64,
}

/// Phrase memory parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseConfig {
    /// Maximum number of events remembered. Must be at least 1.
    pub max_length: usize,
    /// Widest pitch shift in semitones once variation saturates. 0 disables
    /// variation entirely.
    pub variation_amount: f64,
    /// Similarity (0-1) at or above which a gesture counts as a repeat.
    pub similarity_threshold: f64,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        PhraseConfig {
            max_length: 16,
            variation_amount: 2.0,
            similarity_threshold: 0.85,
        }
    }
}

/// Partial update for `PhraseConfig`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhrasePatch {
    pub max_length: Option<usize>,
    pub variation_amount: Option<f64>,
    pub similarity_threshold: Option<f64>,
}

impl PhraseConfig {
    pub fn merged(&self, patch: &PhrasePatch) -> Self {
        PhraseConfig {
            max_length: patch.max_length.unwrap_or(self.max_length),
            variation_amount: patch.variation_amount.unwrap_or(self.variation_amount),
            similarity_threshold: patch
                .similarity_threshold
                .unwrap_or(self.similarity_threshold),
        }
    }
}

/// Rolling note history with repeat detection.
#[derive(Debug, Clone, Default)]
pub struct PhraseMemory {
    config: PhraseConfig,
    buffer: VecDeque<PhraseEvent>,
    replay_count: u32,
}

impl PhraseMemory {
    pub fn new(config: PhraseConfig) -> Self {
        PhraseMemory {
            buffer: VecDeque::with_capacity(config.max_length.min(1024)),
            config,
            replay_count: 0,
        }
    }

    pub fn config(&self) -> &PhraseConfig {
        &self.config
    }

    /// Replace the parameters, keeping history. If `max_length` shrank, the
    /// oldest events are dropped until the buffer fits.
    pub fn set_config(&mut self, config: PhraseConfig) {
        self.config = config;
        self.evict_overflow();
    }

    /// Append an event, evicting the oldest if the buffer is full.
    pub fn record(&mut self, note: u8, velocity: u8, timestamp: f64) {
        self.buffer.push_back(PhraseEvent {
            note,
            velocity,
            timestamp,
        });
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.buffer.len() > self.config.max_length {
            self.buffer.pop_front();
        }
    }

    /// The remembered events, oldest first.
    pub fn phrase(&self) -> Vec<PhraseEvent> {
        self.buffer.iter().copied().collect()
    }

    pub fn last_note(&self) -> Option<u8> {
        self.buffer.back().map(|e| e.note)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn replay_count(&self) -> u32 {
        self.replay_count
    }

    /// Successive note differences; empty with fewer than two events.
    pub fn interval_pattern(&self) -> Vec<i32> {
        self.buffer
            .iter()
            .zip(self.buffer.iter().skip(1))
            .map(|(a, b)| semitones(a.note, b.note))
            .collect()
    }

    /// Fraction of positions (over the shorter pattern) where the two
    /// patterns agree exactly. 0.0 if either is empty.
    pub fn similarity(a: &[i32], b: &[i32]) -> f64 {
        let len = a.len().min(b.len());
        if len == 0 {
            return 0.0;
        }
        let matches = a.iter().zip(b).filter(|(x, y)| x == y).count();
        matches as f64 / len as f64
    }

    /// Compare the stored pattern with `candidate`. Returns true (and bumps
    /// the replay count) when it looks like a repeat; otherwise the count
    /// decays by one toward zero.
    pub fn check_and_evolve(&mut self, candidate: &[i32]) -> bool {
        let similarity = Self::similarity(&self.interval_pattern(), candidate);
        if similarity >= self.config.similarity_threshold {
            self.replay_count = self.replay_count.saturating_add(1);
            true
        } else {
            self.replay_count = self.replay_count.saturating_sub(1);
            false
        }
    }

    /// Shift `note` by a random offset whose width grows with the replay
    /// count. `rand` is expected in `[0, 1)`.
    pub fn apply_variation(&self, note: u8, rand: f64) -> u8 {
        let amount = self.config.variation_amount;
        if amount.is_nan() || amount <= 0.0 {
            return note;
        }
        let scale = f64::from(self.replay_count.min(VARIATION_SATURATION))
            / f64::from(VARIATION_SATURATION);
        // Any shift wider than the MIDI range lands on a boundary anyway.
        let max_shift = (amount * scale).ceil().min(f64::from(MIDI_MAX)) as i32;
        if max_shift == 0 {
            return note;
        }
        let r = if rand.is_nan() {
            0.0
        } else {
            rand.clamp(0.0, 1.0 - f64::EPSILON)
        };
        let shift = (r * f64::from(max_shift * 2 + 1)).floor() as i32 - max_shift;
        clamp_note(i32::from(note) + shift)
    }

    /// Forget everything, including the replay count.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.replay_count = 0;
    }
}
