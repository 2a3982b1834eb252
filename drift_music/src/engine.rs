// The constraint engine: one pointer sample in, one musical decision out.
//
// Pipeline per call to `process`:
//   1. tonal_field: position -> ranked candidates
//   2. gravity: candidates -> primary note (weighted by stability)
//   3. phrase: if the phrase so far plus this note looks like a repeat,
//      vary the primary note
//   4. phrase: record what actually plays
//   5. voice: derive secondary notes from the primary and the previous one
//
// The engine owns the only mutable session state (phrase history and the
// previous primary note); every stage it calls is a pure function of its
// config. `rand` is passed in explicitly so that a recorded seed replays a
// session exactly. The engine must be driven serially; if it ever lives next
// to an audio thread, only `EngineOutput` values should cross over.
//
// See also: `config.rs` for the merged configuration and its patches,
// `clock.rs` for grid-quantized playback, which is independent of this.

use crate::config::{ConfigError, EngineConfig, EngineConfigPatch};
use crate::gravity::apply_gravity;
use crate::phrase::PhraseMemory;
use crate::pitch::{clamp_note, clamp_velocity};
use crate::tonal_field::candidate_notes;
use crate::voice::derive_all_voices;
use drift_prng::DriftRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Velocity used when the caller has no velocity of its own.
pub const DEFAULT_VELOCITY: u8 = 100;

/// Minimum stored interval-pattern length before repeat detection kicks in.
const MIN_PATTERN_FOR_REPEAT: usize = 3;

/// Result of one `process` call. A plain snapshot; safe to hand to another
/// thread or keep for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOutput {
    pub primary_note: u8,
    pub primary_velocity: u8,
    /// One note per configured voice relation, in relation order.
    pub secondary_notes: Vec<u8>,
    /// The tonal-field candidates the primary note was chosen from.
    pub candidates: Vec<u8>,
    /// True if phrase memory altered the primary note.
    pub varied: bool,
}

/// Orchestrates the note-generation pipeline and owns session state.
#[derive(Debug, Clone, Default)]
pub struct ConstraintEngine {
    config: EngineConfig,
    phrase_memory: PhraseMemory,
    previous_primary: Option<u8>,
}

impl ConstraintEngine {
    /// Build an engine, rejecting configs that cannot run.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ConstraintEngine {
            phrase_memory: PhraseMemory::new(config.phrase.clone()),
            config,
            previous_primary: None,
        })
    }

    /// Run one pointer sample through the pipeline.
    ///
    /// `nx`/`ny` are clamped to `[0, 1]` and `velocity` to `0..=127`;
    /// `rand` should be in `[0, 1)`; `timestamp_ms` is only stored in the
    /// phrase history.
    pub fn process(
        &mut self,
        nx: f64,
        ny: f64,
        velocity: u8,
        rand: f64,
        timestamp_ms: f64,
    ) -> EngineOutput {
        let velocity = clamp_velocity(velocity);
        let candidates = candidate_notes(nx, ny, &self.config.tonal_field);
        let mut primary = apply_gravity(&candidates, &self.config.gravity, rand);

        let varied = self.vary_if_repeated(&mut primary, rand);

        self.phrase_memory.record(primary, velocity, timestamp_ms);

        let secondary_notes =
            derive_all_voices(primary, self.previous_primary, &self.config.voice_relations);
        self.previous_primary = Some(primary);

        trace!(nx, ny, primary, varied, "processed");
        EngineOutput {
            primary_note: primary,
            primary_velocity: velocity,
            secondary_notes,
            candidates,
            varied,
        }
    }

    /// Like `process`, drawing `rand` from the given generator.
    pub fn process_with_rng(
        &mut self,
        nx: f64,
        ny: f64,
        velocity: u8,
        rng: &mut DriftRng,
        timestamp_ms: f64,
    ) -> EngineOutput {
        let rand = rng.next_f64();
        self.process(nx, ny, velocity, rand, timestamp_ms)
    }

    /// Check whether `primary` would extend the stored phrase into a repeat
    /// and, if so, replace it with a varied note. Returns whether it did.
    fn vary_if_repeated(&mut self, primary: &mut u8, rand: f64) -> bool {
        let pattern = self.phrase_memory.interval_pattern();
        if pattern.len() < MIN_PATTERN_FOR_REPEAT {
            return false;
        }
        let Some(last) = self.phrase_memory.last_note() else {
            return false;
        };

        // Slide the window: drop the oldest interval, append the new one.
        let mut hypothetical = pattern[1..].to_vec();
        hypothetical.push(i32::from(*primary) - i32::from(last));

        if !self.phrase_memory.check_and_evolve(&hypothetical) {
            return false;
        }
        let varied = clamp_note(i32::from(self.phrase_memory.apply_variation(*primary, rand)));
        debug!(
            from = *primary,
            to = varied,
            replay_count = self.phrase_memory.replay_count(),
            "repeat detected, varying"
        );
        *primary = varied;
        true
    }

    /// Merge `patch` into the configuration. On error the old configuration
    /// stays in place. Phrase history survives; a smaller `max_length` trims
    /// it.
    pub fn update_config(&mut self, patch: &EngineConfigPatch) -> Result<(), ConfigError> {
        let merged = self.config.merged(patch);
        merged.validate()?;
        if merged.phrase != self.config.phrase {
            self.phrase_memory.set_config(merged.phrase.clone());
        }
        debug!(?patch, "engine config updated");
        self.config = merged;
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only view of the phrase history, for overlays and tests.
    pub fn phrase_memory(&self) -> &PhraseMemory {
        &self.phrase_memory
    }

    pub fn previous_primary(&self) -> Option<u8> {
        self.previous_primary
    }

    /// Forget the session: phrase history, replay count and previous note.
    /// Configuration is kept.
    pub fn reset(&mut self) {
        debug!("engine reset");
        self.phrase_memory.clear();
        self.previous_primary = None;
    }
}
