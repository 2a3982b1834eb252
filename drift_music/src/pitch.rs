// MIDI note and pitch-class primitives shared by every pipeline stage.
//
// Notes travel through the pipeline as `u8` but all arithmetic (register
// offsets, intervals, mirrored contrary motion) is done in `i32`, or `i64`
// where configured offsets are summed, so that intermediate values may leave
// the MIDI range. `clamp_note` and `clamp_wide_note` are the exit points back
// into `[0, 127]`.

/// Highest valid MIDI note number.
pub const MIDI_MAX: i32 = 127;

/// Highest valid MIDI velocity.
pub const VELOCITY_MAX: u8 = 127;

/// Clamp an arbitrary semitone value into the MIDI range.
pub fn clamp_note(note: i32) -> u8 {
    note.clamp(0, MIDI_MAX) as u8
}

/// `clamp_note` for widened intermediate values, so sums of configured
/// offsets never overflow before clamping.
pub fn clamp_wide_note(note: i64) -> u8 {
    note.clamp(0, i64::from(MIDI_MAX)) as u8
}

/// Clamp a velocity into the 7-bit MIDI range.
pub fn clamp_velocity(velocity: u8) -> u8 {
    velocity.min(VELOCITY_MAX)
}

/// Pitch class (0-11) of a note, always non-negative.
pub fn pitch_class(note: i32) -> u8 {
    note.rem_euclid(12) as u8
}

/// Pitch class of `note` measured from `root`. Any pair of `i32`s is valid.
pub fn relative_pitch_class(note: i32, root: i32) -> u8 {
    (i64::from(note) - i64::from(root)).rem_euclid(12) as u8
}

/// Signed interval in semitones from `from` to `to`. Positive means `to` is higher.
pub fn semitones(from: u8, to: u8) -> i32 {
    i32::from(to) - i32::from(from)
}
