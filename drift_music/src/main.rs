// Drift performer: CLI entry point.
//
// Plays a scripted gesture through the note pipeline on a beat grid and
// writes the result to MIDI. The loop: advance clock -> sample gesture at each
// emitted tick -> engine (or direct scale mapping) -> record -> MIDI output.
//
// Usage:
//   cargo run -p drift_music --bin perform -- [output.mid] [--config FILE]
//     [--seed N] [--duration-ms MS] [--bpm BPM] [--subdivision N]
//     [--swing AMOUNT] [--gesture figure8|square] [--direct] [--scale NAME]
//
// Without a config file the engine is enabled; with one, its
// `engine.enabled` flag decides. `--direct` always bypasses the engine.

use clap::Parser;
use drift_music::clock::MusicalClock;
use drift_music::config::DriftConfig;
use drift_music::engine::{ConstraintEngine, EngineOutput};
use drift_music::gesture::GesturePath;
use drift_music::midi::write_midi;
use drift_music::performance::Performance;
use drift_music::pitch::clamp_note;
use drift_music::scale::{
    ScaleType, map_position_to_pitch, map_position_to_velocity, note_name, scale_notes,
};
use drift_prng::DriftRng;
use std::path::PathBuf;
use tracing::{debug, info};

/// Step between clock polls, one display frame at 60 Hz.
const FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Parser)]
#[command(name = "perform")]
#[command(about = "Play a scripted gesture through the drift pipeline and write MIDI")]
struct Cli {
    /// Output MIDI file
    #[arg(default_value = "drift.mid")]
    output: PathBuf,

    /// JSON config with `engine` and `clock` groups
    #[arg(long)]
    config: Option<PathBuf>,

    /// PRNG seed; taken from the system clock when omitted
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 16_000.0)]
    duration_ms: f64,

    #[arg(long)]
    bpm: Option<f64>,

    #[arg(long)]
    subdivision: Option<u32>,

    #[arg(long)]
    swing: Option<f64>,

    /// Gesture preset: figure8 or square
    #[arg(long, default_value = "figure8")]
    gesture: String,

    /// Map straight onto a scale instead of running the engine
    #[arg(long)]
    direct: bool,

    /// Scale for direct mode
    #[arg(long, default_value = "pentatonic")]
    scale: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DriftConfig::load(path)?,
        None => {
            let mut config = DriftConfig::default();
            config.engine.enabled = true;
            config
        }
    };
    if let Some(bpm) = cli.bpm {
        config.clock.bpm = bpm;
    }
    if let Some(subdivision) = cli.subdivision {
        config.clock.subdivision = subdivision;
    }
    if let Some(swing) = cli.swing {
        config.clock.swing_amount = swing;
    }
    config.validate()?;

    let gesture = GesturePath::from_name(&cli.gesture)
        .ok_or_else(|| format!("unknown gesture '{}'", cli.gesture))?;
    let scale = ScaleType::from_name(&cli.scale)
        .ok_or_else(|| format!("unknown scale '{}'", cli.scale))?;
    let use_engine = config.engine.enabled && !cli.direct;

    let seed = cli.seed.unwrap_or_else(seed_from_time);
    let mut rng = DriftRng::from_u64(seed);

    let mut clock = MusicalClock::new(config.clock.clone(), 0.0);
    let mut engine = ConstraintEngine::new(config.engine.clone())?;
    let direct_notes = scale_notes(
        scale,
        clamp_note(config.engine.tonal_field.root_note),
        config.engine.tonal_field.octave_range.max(1),
    );

    info!(
        output = %cli.output.display(),
        seed,
        bpm = clock.bpm(),
        subdivision = clock.subdivision(),
        mode = if use_engine { "engine" } else { scale.label() },
        "starting performance"
    );

    let secondary_voices = if use_engine {
        config.engine.voice_relations.len()
    } else {
        0
    };
    let mut perf = Performance::new(clock.bpm(), secondary_voices);
    let note_ms = clock.tick_ms();
    let mut varied = 0usize;

    let mut now = 0.0;
    while now < cli.duration_ms {
        for beat in clock.advance(now) {
            if beat.beat_time >= cli.duration_ms {
                continue;
            }
            let pos = gesture.sample(beat.beat_time);
            let velocity = map_position_to_velocity(pos.ny).max(1);
            let output = if use_engine {
                engine.process_with_rng(pos.nx, pos.ny, velocity, &mut rng, beat.beat_time)
            } else {
                let Some(note) = map_position_to_pitch(pos.nx, &direct_notes) else {
                    continue;
                };
                EngineOutput {
                    primary_note: note,
                    primary_velocity: velocity,
                    secondary_notes: Vec::new(),
                    candidates: vec![note],
                    varied: false,
                }
            };
            if output.varied {
                varied += 1;
            }
            debug!(
                tick = beat.beat_index,
                note = %note_name(output.primary_note),
                velocity,
                "beat"
            );
            perf.record_output(&output, beat.beat_time, note_ms);
        }
        now += FRAME_MS;
    }

    write_midi(&perf, &cli.output)?;
    info!(
        events = perf.events.len(),
        tracks = perf.num_tracks(),
        varied,
        replay_count = engine.phrase_memory().replay_count(),
        "wrote {}",
        cli.output.display()
    );
    Ok(())
}

fn seed_from_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
