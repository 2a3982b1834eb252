// Recorded performance: timed note events grouped into tracks.
//
// Track 0 holds the primary note; track i+1 holds the i-th secondary voice,
// so the track layout mirrors the engine's voice relations. Times are in
// milliseconds from the start of the session. `midi.rs` renders this to a
// Standard MIDI File.

use crate::engine::EngineOutput;
use serde::{Deserialize, Serialize};

/// One sounding note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub track: usize,
    pub note: u8,
    pub velocity: u8,
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl NoteEvent {
    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub bpm: f64,
    pub track_names: Vec<String>,
    pub events: Vec<NoteEvent>,
}

impl Performance {
    /// An empty performance with a primary track and `secondary_voices`
    /// further tracks.
    pub fn new(bpm: f64, secondary_voices: usize) -> Self {
        let mut track_names = vec!["Primary".to_string()];
        track_names.extend((1..=secondary_voices).map(|i| format!("Voice {i}")));
        Performance {
            bpm,
            track_names,
            events: Vec::new(),
        }
    }

    pub fn num_tracks(&self) -> usize {
        self.track_names.len()
    }

    /// Add a single event, growing the track list if needed.
    pub fn push(&mut self, event: NoteEvent) {
        while self.track_names.len() <= event.track {
            let i = self.track_names.len();
            self.track_names.push(format!("Voice {i}"));
        }
        self.events.push(event);
    }

    /// Record one engine decision: the primary on track 0, secondary notes on
    /// the following tracks. Secondary voices share the primary velocity.
    pub fn record_output(&mut self, output: &EngineOutput, start_ms: f64, duration_ms: f64) {
        self.push(NoteEvent {
            track: 0,
            note: output.primary_note,
            velocity: output.primary_velocity,
            start_ms,
            duration_ms,
        });
        for (i, &note) in output.secondary_notes.iter().enumerate() {
            self.push(NoteEvent {
                track: i + 1,
                note,
                velocity: output.primary_velocity,
                start_ms,
                duration_ms,
            });
        }
    }

    /// Events on one track, sorted by start time.
    pub fn track_events(&self, track: usize) -> Vec<&NoteEvent> {
        let mut events: Vec<&NoteEvent> = self.events.iter().filter(|e| e.track == track).collect();
        events.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));
        events
    }

    /// End time of the last sounding note, 0 when empty.
    pub fn duration_ms(&self) -> f64 {
        self.events.iter().map(NoteEvent::end_ms).fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(primary: u8, secondary: Vec<u8>) -> EngineOutput {
        EngineOutput {
            primary_note: primary,
            primary_velocity: 90,
            secondary_notes: secondary,
            candidates: vec![primary],
            varied: false,
        }
    }

    #[test]
    fn test_new_names_tracks() {
        let perf = Performance::new(120.0, 2);
        assert_eq!(perf.track_names, vec!["Primary", "Voice 1", "Voice 2"]);
        assert!(perf.is_empty());
        assert_eq!(perf.duration_ms(), 0.0);
    }

    #[test]
    fn test_record_output_layout() {
        let mut perf = Performance::new(120.0, 2);
        perf.record_output(&output(60, vec![67, 48]), 0.0, 250.0);
        perf.record_output(&output(62, vec![69, 48]), 250.0, 250.0);
        assert_eq!(perf.events.len(), 6);
        let primary: Vec<u8> = perf.track_events(0).iter().map(|e| e.note).collect();
        assert_eq!(primary, vec![60, 62]);
        let drone: Vec<u8> = perf.track_events(2).iter().map(|e| e.note).collect();
        assert_eq!(drone, vec![48, 48]);
        assert!(perf.events.iter().all(|e| e.velocity == 90));
        assert_eq!(perf.duration_ms(), 500.0);
    }

    #[test]
    fn test_push_grows_tracks() {
        let mut perf = Performance::new(100.0, 0);
        perf.record_output(&output(60, vec![64, 67]), 0.0, 100.0);
        assert_eq!(perf.num_tracks(), 3);
        assert_eq!(perf.track_names[2], "Voice 2");
    }

    #[test]
    fn test_track_events_sorted() {
        let mut perf = Performance::new(120.0, 0);
        for start in [300.0, 100.0, 200.0] {
            perf.push(NoteEvent {
                track: 0,
                note: 60,
                velocity: 80,
                start_ms: start,
                duration_ms: 50.0,
            });
        }
        let starts: Vec<f64> = perf.track_events(0).iter().map(|e| e.start_ms).collect();
        assert_eq!(starts, vec![100.0, 200.0, 300.0]);
        assert_eq!(perf.duration_ms(), 350.0);
    }
}
