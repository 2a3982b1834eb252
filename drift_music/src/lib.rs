// Drift music pipeline
//
// Turns a continuous 2D pointer position into notes that stay in key, lean
// toward stable scale degrees, vary themselves when a gesture repeats, and
// carry contrapuntal secondary voices. Timing is kept on a beat grid by a
// separate clock so that the pipeline itself has no notion of time.
//
// Architecture:
// - pitch.rs: MIDI note helpers (clamping, pitch classes)
// - tonal_field.rs: position -> ranked candidate notes (stability order)
// - gravity.rs: weighted, rand-driven choice of one candidate
// - phrase.rs: rolling note history, repeat detection, bounded variation
// - voice.rs: secondary notes from parallel/contrary/follower/drone rules
// - clock.rs: tempo grid, quantization, swing, lookahead beat emission
// - config.rs: engine + clock configuration, patches, JSON loading
// - engine.rs: ConstraintEngine, the orchestrator owning session state
// - scale.rs: direct scale mapping used when the engine is disabled
// - gesture.rs: scripted pointer trajectories for headless sessions
// - performance.rs: timed note events collected per track
// - midi.rs: Standard MIDI File export and live channel messages
//
// Every random choice takes its `rand` value from the caller, usually drawn
// from `drift_prng::DriftRng`, so a seed reproduces a whole session.

pub mod clock;
pub mod config;
pub mod engine;
pub mod gesture;
pub mod gravity;
pub mod midi;
pub mod performance;
pub mod phrase;
pub mod pitch;
pub mod scale;
pub mod tonal_field;
pub mod voice;
