// Test-only session driver for pipeline integration tests.
//
// Wraps a real `ConstraintEngine`, a real `MusicalClock` and a seeded
// `DriftRng` behind a small synchronous API: load a config, pick a gesture,
// run the clock forward in frame-sized steps and collect every decision the
// engine made. This is the same loop the `perform` binary runs, minus MIDI
// output.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use drift_music::clock::{BeatEvent, MusicalClock};
use drift_music::config::{DriftConfig, EngineConfigPatch};
use drift_music::engine::{ConstraintEngine, EngineOutput};
use drift_music::gesture::GesturePath;
use drift_music::performance::Performance;
use drift_prng::DriftRng;

/// Poll step for `run_until`, one 60 Hz frame.
pub const FRAME_MS: f64 = 1000.0 / 60.0;

/// One engine decision together with the grid tick that triggered it.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub beat: BeatEvent,
    pub output: EngineOutput,
}

/// A headless session: clock-driven gesture through the engine.
pub struct ScriptedSession {
    pub engine: ConstraintEngine,
    pub clock: MusicalClock,
    pub gesture: GesturePath,
    rng: DriftRng,
    now_ms: f64,
    pub performance: Performance,
}

impl ScriptedSession {
    /// Build a session from a parsed config.
    pub fn new(config: DriftConfig, gesture: GesturePath, seed: u32) -> Self {
        let engine = ConstraintEngine::new(config.engine.clone())
            .expect("ScriptedSession::new: invalid engine config");
        let clock = MusicalClock::new(config.clock, 0.0);
        let performance = Performance::new(clock.bpm(), config.engine.voice_relations.len());
        Self {
            engine,
            clock,
            gesture,
            rng: DriftRng::new(seed),
            now_ms: 0.0,
            performance,
        }
    }

    /// Build a session from JSON config text.
    pub fn from_json(json: &str, gesture: GesturePath, seed: u32) -> Self {
        let config = DriftConfig::from_json(json).expect("ScriptedSession::from_json failed");
        Self::new(config, gesture, seed)
    }

    /// Advance the clock in frame steps until `end_ms`, running the engine on
    /// every emitted tick. Returns the steps taken during this call.
    pub fn run_until(&mut self, end_ms: f64) -> Vec<Step> {
        let mut steps = Vec::new();
        while self.now_ms < end_ms {
            for beat in self.clock.advance(self.now_ms) {
                let pos = self.gesture.sample(beat.beat_time);
                let output = self.engine.process_with_rng(
                    pos.nx,
                    pos.ny,
                    drift_music::engine::DEFAULT_VELOCITY,
                    &mut self.rng,
                    beat.beat_time,
                );
                self.performance
                    .record_output(&output, beat.beat_time, self.clock.tick_ms());
                steps.push(Step { beat, output });
            }
            self.now_ms += FRAME_MS;
        }
        steps
    }

    /// Apply a config patch mid-session.
    pub fn update(&mut self, patch_json: &str) {
        let patch: EngineConfigPatch =
            serde_json::from_str(patch_json).expect("ScriptedSession::update: bad patch JSON");
        self.engine
            .update_config(&patch)
            .expect("ScriptedSession::update: rejected patch");
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }
}

/// Primary notes of a run, for compact comparisons.
pub fn primaries(steps: &[Step]) -> Vec<u8> {
    steps.iter().map(|s| s.output.primary_note).collect()
}
