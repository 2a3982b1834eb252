// MIDI output from recorded performances.
//
// Converts a Performance into a Standard MIDI File (SMF) for playback. Track
// 0 carries the tempo; each performance track becomes its own MIDI track on
// its own channel. Millisecond times map to ticks through the performance
// tempo.
//
// Also encodes single live channel messages (note on / note off), the 3-byte
// form an external synth adapter sends over the wire.
//
// Uses the `midly` crate for MIDI writing. Output is SMF Format 1 (multi-track).

use crate::clock::BPM_RANGE;
use crate::performance::Performance;
use crate::pitch::{clamp_note, clamp_velocity};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    live::LiveEvent,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// General MIDI percussion channel, never assigned to a melodic track.
const PERCUSSION_CHANNEL: u8 = 9;

/// Acoustic grand for the primary voice, string ensemble for the rest.
const PRIMARY_PROGRAM: u8 = 0;
const SECONDARY_PROGRAM: u8 = 48;

/// Convert a Performance to MIDI and write to a file.
pub fn write_midi(perf: &Performance, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let buf = smf_bytes(perf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

/// Encode a Performance as SMF bytes.
pub fn smf_bytes(perf: &Performance) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let smf = performance_to_smf(perf);
    let mut buf = Vec::new();
    smf.write(&mut buf)?;
    Ok(buf)
}

/// Convert a Performance to an in-memory SMF.
pub fn performance_to_smf(perf: &Performance) -> Smf<'_> {
    let bpm = midi_bpm(perf.bpm);
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    let tempo_microseconds = (60_000_000.0 / bpm).round() as u32;
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]);

    for (ti, name) in perf.track_names.iter().enumerate() {
        let channel = u4::new(channel_for_track(ti));
        let program = if ti == 0 {
            PRIMARY_PROGRAM
        } else {
            SECONDARY_PROGRAM
        };
        let mut track: Track<'_> = vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::ProgramChange {
                        program: u7::new(program),
                    },
                },
            },
        ];

        // (tick, is_on, note, velocity); offs sort before ons at the same tick
        // so a repeated note is released before it is struck again.
        let mut timeline: Vec<(u32, bool, u8, u8)> = Vec::new();
        for event in perf.events.iter().filter(|e| e.track == ti) {
            let on = ms_to_ticks(event.start_ms, bpm);
            let off = ms_to_ticks(event.end_ms(), bpm).max(on + 1);
            let note = clamp_note(i32::from(event.note));
            timeline.push((on, true, note, clamp_velocity(event.velocity)));
            timeline.push((off, false, note, 0));
        }
        timeline.sort_by_key(|&(tick, is_on, note, _)| (tick, is_on, note));

        let mut last_tick = 0;
        for (tick, is_on, note, velocity) in timeline {
            let key = u7::new(note);
            let message = if is_on {
                MidiMessage::NoteOn {
                    key,
                    vel: u7::new(velocity),
                }
            } else {
                MidiMessage::NoteOff {
                    key,
                    vel: u7::new(0),
                }
            };
            track.push(TrackEvent {
                delta: u28::new(tick - last_tick),
                kind: TrackEventKind::Midi { channel, message },
            });
            last_tick = tick;
        }

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);
    }

    smf
}

/// Milliseconds from session start to ticks at `bpm`.
pub fn ms_to_ticks(ms: f64, bpm: f64) -> u32 {
    if !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    let quarters = ms * bpm / 60_000.0;
    (quarters * f64::from(TICKS_PER_QUARTER)).round() as u32
}

/// Channel for a performance track: sequential, skipping percussion, wrapping
/// after the 15 melodic channels.
pub fn channel_for_track(track: usize) -> u8 {
    let c = (track % 15) as u8;
    if c >= PERCUSSION_CHANNEL { c + 1 } else { c }
}

fn midi_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(BPM_RANGE.0, BPM_RANGE.1)
    } else {
        120.0
    }
}

/// Encode a note-on channel message. Channel is masked to 4 bits, note and
/// velocity to 7.
pub fn note_on_message(channel: u8, note: u8, velocity: u8) -> std::io::Result<Vec<u8>> {
    live_bytes(LiveEvent::Midi {
        channel: u4::new(channel & 0x0F),
        message: MidiMessage::NoteOn {
            key: u7::new(note & 0x7F),
            vel: u7::new(velocity & 0x7F),
        },
    })
}

/// Encode a note-off channel message with release velocity 0.
pub fn note_off_message(channel: u8, note: u8) -> std::io::Result<Vec<u8>> {
    live_bytes(LiveEvent::Midi {
        channel: u4::new(channel & 0x0F),
        message: MidiMessage::NoteOff {
            key: u7::new(note & 0x7F),
            vel: u7::new(0),
        },
    })
}

fn live_bytes(event: LiveEvent<'_>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(3);
    event.write_std(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::NoteEvent;

    fn sample_performance() -> Performance {
        let mut perf = Performance::new(120.0, 1);
        for (i, note) in [60u8, 64, 67, 72].into_iter().enumerate() {
            let start = i as f64 * 500.0;
            perf.push(NoteEvent {
                track: 0,
                note,
                velocity: 100,
                start_ms: start,
                duration_ms: 500.0,
            });
            perf.push(NoteEvent {
                track: 1,
                note: 48,
                velocity: 70,
                start_ms: start,
                duration_ms: 500.0,
            });
        }
        perf
    }

    fn note_ons(track: &Track<'_>) -> Vec<(u32, u8)> {
        let mut tick = 0;
        let mut ons = Vec::new();
        for event in track {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, .. },
                ..
            } = event.kind
            {
                ons.push((tick, key.as_int()));
            }
        }
        ons
    }

    #[test]
    fn test_ms_to_ticks() {
        // 500 ms at 120 BPM is one quarter.
        assert_eq!(ms_to_ticks(500.0, 120.0), 480);
        assert_eq!(ms_to_ticks(250.0, 120.0), 240);
        assert_eq!(ms_to_ticks(1000.0, 60.0), 480);
        assert_eq!(ms_to_ticks(-5.0, 120.0), 0);
        assert_eq!(ms_to_ticks(f64::NAN, 120.0), 0);
    }

    #[test]
    fn test_channel_skips_percussion() {
        let channels: Vec<u8> = (0..16).map(channel_for_track).collect();
        assert!(!channels[..15].contains(&PERCUSSION_CHANNEL));
        assert_eq!(channels[8], 8);
        assert_eq!(channels[9], 10);
        assert_eq!(channels[14], 15);
        assert_eq!(channels[15], 0);
    }

    #[test]
    fn test_smf_layout() {
        let perf = sample_performance();
        let smf = performance_to_smf(&perf);
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.tracks.len(), 3);
        assert!(smf.tracks[0].iter().any(|e| matches!(
            e.kind,
            TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 500_000
        )));
        assert_eq!(
            note_ons(&smf.tracks[1]),
            vec![(0, 60), (480, 64), (960, 67), (1440, 72)]
        );
        assert_eq!(note_ons(&smf.tracks[2]).len(), 4);
    }

    #[test]
    fn test_repeated_note_released_before_restrike() {
        let perf = sample_performance();
        let smf = performance_to_smf(&perf);
        let drone = &smf.tracks[2];
        let mut held = false;
        for event in drone {
            match event.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { .. },
                    ..
                } => {
                    assert!(!held, "note struck while still held");
                    held = true;
                }
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOff { .. },
                    ..
                } => held = false,
                _ => {}
            }
        }
        assert!(!held);
    }

    #[test]
    fn test_write_and_parse_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.mid");
        write_midi(&sample_performance(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"MThd");
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 3);
        assert_eq!(
            smf.header.timing,
            Timing::Metrical(u15::new(TICKS_PER_QUARTER))
        );
    }

    #[test]
    fn test_out_of_range_values_are_clamped_not_wrapped() {
        let mut perf = Performance::new(120.0, 0);
        perf.push(NoteEvent {
            track: 0,
            note: 200,
            velocity: 200,
            start_ms: 0.0,
            duration_ms: 500.0,
        });
        let smf = performance_to_smf(&perf);
        let on = smf.tracks[1].iter().find_map(|e| match e.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } => Some((key.as_int(), vel.as_int())),
            _ => None,
        });
        assert_eq!(on, Some((127, 127)));
    }

    #[test]
    fn test_empty_performance() {
        let perf = Performance::new(90.0, 0);
        let smf = performance_to_smf(&perf);
        assert_eq!(smf.tracks.len(), 2);
        assert!(note_ons(&smf.tracks[1]).is_empty());
    }

    #[test]
    fn test_live_messages() {
        assert_eq!(note_on_message(0, 60, 100).unwrap(), vec![0x90, 60, 100]);
        assert_eq!(note_on_message(3, 72, 64).unwrap(), vec![0x93, 72, 64]);
        assert_eq!(note_off_message(1, 60).unwrap(), vec![0x81, 60, 0]);
    }

    #[test]
    fn test_live_messages_mask_out_of_range() {
        assert_eq!(note_on_message(0x12, 200, 255).unwrap(), vec![0x92, 200 & 0x7F, 0x7F]);
        assert_eq!(note_off_message(0xFF, 0x80).unwrap(), vec![0x8F, 0, 0]);
    }
}
