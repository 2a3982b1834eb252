// Musical clock: a BPM grid over wall-clock milliseconds.
//
// The free functions are pure grid arithmetic (tick length, snapping to the
// nearest or next grid point, beat index, swing). `MusicalClock` is a cursor
// over that grid: each `advance` call looks `lookahead_ms` ahead of the given
// time and returns every tick it has not yet emitted, in order. A tick is
// never emitted twice, and calling `advance` with a repeated or earlier time
// yields nothing new because the processed-tick cursor only moves forward.
// A jump far ahead emits only the newest `MAX_TICKS_PER_ADVANCE` ticks.
//
// The clock works in event time (milliseconds), not audio samples. It does
// not own a timer; whoever drives it (an animation frame loop, the `perform`
// binary) supplies the current time.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Supported tempo range in beats per minute.
pub const BPM_RANGE: (f64, f64) = (20.0, 300.0);

/// Supported grid subdivisions per beat.
pub const SUBDIVISION_RANGE: (u32, u32) = (1, 8);

/// Largest swing offset, as a fraction of one tick.
pub const MAX_SWING: f64 = 0.5;

/// Most ticks a single `advance` call returns. After a longer stall only the
/// newest ticks are emitted; the older ones are skipped, never replayed.
pub const MAX_TICKS_PER_ADVANCE: i64 = 1024;

/// Clock parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub bpm: f64,
    /// Grid ticks per beat (1 = quarters, 2 = eighths, 4 = sixteenths).
    pub subdivision: u32,
    /// How far ahead of the current time ticks are emitted.
    pub lookahead_ms: f64,
    /// 0.0 = straight, 0.5 = full shuffle on off-beat ticks.
    pub swing_amount: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            bpm: 120.0,
            subdivision: 2,
            lookahead_ms: 100.0,
            swing_amount: 0.0,
        }
    }
}

impl SchedulerConfig {
    /// Copy with tempo and subdivision pulled into their supported ranges.
    pub fn sanitized(&self) -> Self {
        SchedulerConfig {
            bpm: clamp_bpm(self.bpm),
            subdivision: clamp_subdivision(self.subdivision),
            lookahead_ms: if self.lookahead_ms.is_finite() {
                self.lookahead_ms.max(0.0)
            } else {
                0.0
            },
            swing_amount: self.swing_amount,
        }
    }
}

fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        BPM_RANGE.0
    } else {
        bpm.clamp(BPM_RANGE.0, BPM_RANGE.1)
    }
}

fn clamp_subdivision(subdivision: u32) -> u32 {
    subdivision.clamp(SUBDIVISION_RANGE.0, SUBDIVISION_RANGE.1)
}

/// One emitted grid tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Scheduled time in milliseconds, swing included.
    pub beat_time: f64,
    /// Grid tick index counted from the clock origin.
    pub beat_index: i64,
}

/// Length of one grid tick in milliseconds.
pub fn tick_duration_ms(bpm: f64, subdivision: u32) -> f64 {
    60_000.0 / bpm / f64::from(subdivision)
}

/// Round half up, matching the grid's tie rule.
fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Snap `time_ms` to the nearest grid point measured from `start_ms`.
pub fn quantize(time_ms: f64, bpm: f64, subdivision: u32, start_ms: f64) -> f64 {
    let tick = tick_duration_ms(bpm, subdivision);
    start_ms + round_half_up((time_ms - start_ms) / tick) * tick
}

/// The first grid point at or after `time_ms`.
pub fn next_grid_time(time_ms: f64, bpm: f64, subdivision: u32, start_ms: f64) -> f64 {
    let tick = tick_duration_ms(bpm, subdivision);
    start_ms + ((time_ms - start_ms) / tick).ceil() * tick
}

/// Zero-based beat (not tick) containing `time_ms`.
pub fn beat_index(time_ms: f64, bpm: f64, start_ms: f64) -> i64 {
    let beat = 60_000.0 / bpm;
    ((time_ms - start_ms) / beat).floor() as i64
}

/// Push off-beat (odd) ticks later by `swing_amount` of a tick.
///
/// No-op for non-positive swing or when there is only one tick per beat.
pub fn apply_swing(
    grid_time_ms: f64,
    bpm: f64,
    subdivision: u32,
    swing_amount: f64,
    start_ms: f64,
) -> f64 {
    if swing_amount.is_nan() || swing_amount <= 0.0 || subdivision < 2 {
        return grid_time_ms;
    }
    let tick = tick_duration_ms(bpm, subdivision);
    let tick_index = round_half_up((grid_time_ms - start_ms) / tick) as i64;
    if tick_index.rem_euclid(2) == 1 {
        grid_time_ms + tick * swing_amount.min(MAX_SWING)
    } else {
        grid_time_ms
    }
}

/// Stateful cursor over the beat grid.
#[derive(Debug, Clone)]
pub struct MusicalClock {
    config: SchedulerConfig,
    start_ms: f64,
    /// Highest tick index already emitted; -1 before the first.
    last_processed_tick: i64,
}

impl MusicalClock {
    pub fn new(config: SchedulerConfig, start_ms: f64) -> Self {
        MusicalClock {
            config: config.sanitized(),
            start_ms,
            last_processed_tick: -1,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn start_ms(&self) -> f64 {
        self.start_ms
    }

    pub fn tick_ms(&self) -> f64 {
        tick_duration_ms(self.config.bpm, self.config.subdivision)
    }

    /// Emit every not-yet-emitted tick up to `current_ms + lookahead`, at
    /// most `MAX_TICKS_PER_ADVANCE` of them (the newest).
    pub fn advance(&mut self, current_ms: f64) -> Vec<BeatEvent> {
        let tick = self.tick_ms();
        let horizon = current_ms + self.config.lookahead_ms;
        let horizon_tick = ((horizon - self.start_ms) / tick).floor();
        if !horizon_tick.is_finite() || horizon_tick <= self.last_processed_tick as f64 {
            return Vec::new();
        }
        let horizon_tick = horizon_tick as i64;
        let first_tick =
            (self.last_processed_tick + 1).max(horizon_tick - MAX_TICKS_PER_ADVANCE + 1);
        if first_tick > self.last_processed_tick + 1 {
            debug!(
                skipped = first_tick - self.last_processed_tick - 1,
                "clock stalled, dropping stale ticks"
            );
        }

        let events: Vec<BeatEvent> = (first_tick..=horizon_tick)
            .map(|t| {
                let grid_time = self.start_ms + t as f64 * tick;
                BeatEvent {
                    beat_time: apply_swing(
                        grid_time,
                        self.config.bpm,
                        self.config.subdivision,
                        self.config.swing_amount,
                        self.start_ms,
                    ),
                    beat_index: t,
                }
            })
            .collect();
        self.last_processed_tick = horizon_tick;
        events
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.config.bpm = clamp_bpm(bpm);
    }

    pub fn bpm(&self) -> f64 {
        self.config.bpm
    }

    pub fn set_subdivision(&mut self, subdivision: u32) {
        self.config.subdivision = clamp_subdivision(subdivision);
    }

    pub fn subdivision(&self) -> u32 {
        self.config.subdivision
    }

    pub fn set_swing(&mut self, swing_amount: f64) {
        self.config.swing_amount = swing_amount;
    }

    /// Move the origin and forget which ticks were emitted.
    pub fn reset(&mut self, start_ms: f64) {
        debug!(start_ms, "clock reset");
        self.start_ms = start_ms;
        self.last_processed_tick = -1;
    }
}
