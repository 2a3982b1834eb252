// Direct scale mapping, the alternative to the constraint engine.
//
// When `EngineConfig::enabled` is false the caller skips the tonal field and
// maps the pointer straight onto a scale: x picks a scale step, y picks a
// velocity. This module holds the scale tables for that mode plus the small
// conversions every caller needs (screen coordinates to a normalized
// position, note numbers to names and frequencies).
//
// Used by the `perform` binary's `--direct` mode and by overlays that label
// candidate notes.

use crate::tonal_field::{Position, clamp_unit};
use serde::{Deserialize, Serialize};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Scale families available for direct mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleType {
    /// Major scale.
    Diatonic,
    Chromatic,
    /// Major pentatonic.
    Pentatonic,
    Blues,
    /// Natural minor.
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
}

impl ScaleType {
    pub const ALL: [ScaleType; 9] = [
        ScaleType::Diatonic,
        ScaleType::Chromatic,
        ScaleType::Pentatonic,
        ScaleType::Blues,
        ScaleType::Minor,
        ScaleType::Dorian,
        ScaleType::Phrygian,
        ScaleType::Lydian,
        ScaleType::Mixolydian,
    ];

    /// Semitone offsets from the root for one octave.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleType::Diatonic => &[0, 2, 4, 5, 7, 9, 11],
            ScaleType::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            ScaleType::Pentatonic => &[0, 2, 4, 7, 9],
            ScaleType::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleType::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleType::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleType::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleType::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleType::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
        }
    }

    /// Display name.
    pub fn label(self) -> &'static str {
        match self {
            ScaleType::Diatonic => "Major",
            ScaleType::Chromatic => "Chromatic",
            ScaleType::Pentatonic => "Pentatonic",
            ScaleType::Blues => "Blues",
            ScaleType::Minor => "Natural Minor",
            ScaleType::Dorian => "Dorian",
            ScaleType::Phrygian => "Phrygian",
            ScaleType::Lydian => "Lydian",
            ScaleType::Mixolydian => "Mixolydian",
        }
    }

    /// Parse a lowercase scale name (`"major"` is accepted for `Diatonic`).
    pub fn from_name(name: &str) -> Option<ScaleType> {
        match name.to_lowercase().as_str() {
            "diatonic" | "major" => Some(ScaleType::Diatonic),
            "chromatic" => Some(ScaleType::Chromatic),
            "pentatonic" => Some(ScaleType::Pentatonic),
            "blues" => Some(ScaleType::Blues),
            "minor" | "aeolian" => Some(ScaleType::Minor),
            "dorian" => Some(ScaleType::Dorian),
            "phrygian" => Some(ScaleType::Phrygian),
            "lydian" => Some(ScaleType::Lydian),
            "mixolydian" => Some(ScaleType::Mixolydian),
            _ => None,
        }
    }
}

/// All notes of `scale` over `octaves` octaves starting at `root`, ascending.
/// Notes above 127 are dropped.
pub fn scale_notes(scale: ScaleType, root: u8, octaves: u32) -> Vec<u8> {
    let mut notes = Vec::new();
    for octave in 0..octaves {
        for &interval in scale.intervals() {
            let note = u32::from(root) + octave * 12 + u32::from(interval);
            if note <= 127 {
                notes.push(note as u8);
            }
        }
    }
    notes
}

/// Convert a pixel position inside a `width` x `height` surface to a
/// normalized, clamped position.
pub fn normalize_position(x: f64, y: f64, width: f64, height: f64) -> Position {
    Position {
        nx: clamp_unit(x / width),
        ny: clamp_unit(y / height),
    }
}

/// Pick the scale step under `nx`. Returns `None` for an empty scale.
pub fn map_position_to_pitch(nx: f64, notes: &[u8]) -> Option<u8> {
    if notes.is_empty() {
        return None;
    }
    let index = (clamp_unit(nx) * notes.len() as f64).floor() as usize;
    notes.get(index.min(notes.len() - 1)).copied()
}

/// Top of the surface plays loudest: `ny = 0` is 127, `ny = 1` is 0.
pub fn map_position_to_velocity(ny: f64) -> u8 {
    ((1.0 - clamp_unit(ny)) * 127.0).round() as u8
}

/// Equal-tempered frequency in Hz, A4 (69) = 440.
pub fn note_to_frequency(note: u8) -> f64 {
    440.0 * 2f64.powf((f64::from(note) - 69.0) / 12.0)
}

/// Scientific pitch name with sharps, middle C (60) = "C4".
pub fn note_name(note: u8) -> String {
    let octave = i32::from(note / 12) - 1;
    format!("{}{}", NOTE_NAMES[usize::from(note % 12)], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_per_octave() {
        let expected = [
            (ScaleType::Diatonic, 7),
            (ScaleType::Chromatic, 12),
            (ScaleType::Pentatonic, 5),
            (ScaleType::Blues, 6),
            (ScaleType::Minor, 7),
            (ScaleType::Dorian, 7),
            (ScaleType::Phrygian, 7),
            (ScaleType::Lydian, 7),
            (ScaleType::Mixolydian, 7),
        ];
        for (scale, count) in expected {
            let notes = scale_notes(scale, 60, 1);
            assert_eq!(notes.len(), count, "{}", scale.label());
            assert_eq!(notes[0], 60);
        }
    }

    #[test]
    fn test_multiple_octaves() {
        assert_eq!(scale_notes(ScaleType::Diatonic, 60, 2).len(), 14);
        assert_eq!(scale_notes(ScaleType::Pentatonic, 60, 2).len(), 10);
    }

    #[test]
    fn test_never_exceeds_127() {
        let notes = scale_notes(ScaleType::Chromatic, 120, 3);
        assert_eq!(notes.len(), 8);
        assert!(notes.iter().all(|&n| n <= 127));
    }

    #[test]
    fn test_from_name() {
        for scale in ScaleType::ALL {
            let name = format!("{scale:?}");
            assert_eq!(ScaleType::from_name(&name), Some(scale));
        }
        assert_eq!(ScaleType::from_name("major"), Some(ScaleType::Diatonic));
        assert_eq!(ScaleType::from_name("klezmer"), None);
    }

    #[test]
    fn test_normalize_position() {
        let p = normalize_position(50.0, 50.0, 100.0, 100.0);
        assert_eq!((p.nx, p.ny), (0.5, 0.5));
        let p = normalize_position(-10.0, 200.0, 100.0, 100.0);
        assert_eq!((p.nx, p.ny), (0.0, 1.0));
    }

    #[test]
    fn test_map_position_to_pitch() {
        let notes = [60, 62, 64, 65, 67, 69, 71];
        assert_eq!(map_position_to_pitch(0.0, &notes), Some(60));
        assert_eq!(map_position_to_pitch(1.0, &notes), Some(71));
        assert_eq!(map_position_to_pitch(0.5, &notes), Some(65));
        assert_eq!(map_position_to_pitch(0.5, &[]), None);
    }

    #[test]
    fn test_map_position_to_velocity() {
        assert_eq!(map_position_to_velocity(0.0), 127);
        assert_eq!(map_position_to_velocity(1.0), 0);
        let mid = map_position_to_velocity(0.5);
        assert!((61..70).contains(&mid));
    }

    #[test]
    fn test_frequency() {
        assert!((note_to_frequency(69) - 440.0).abs() < 1e-9);
        assert!((note_to_frequency(81) - 880.0).abs() < 1e-9);
    }

    #[test]
    fn test_note_name() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(69), "A4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(72), "C5");
        assert_eq!(note_name(0), "C-1");
    }
}
