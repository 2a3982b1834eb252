// Voice relations: secondary notes derived from the primary note.
//
// Each relation is a rule, not a chord tone. Parallel voices shadow the
// primary at a fixed interval, contrary voices mirror it about an anchor,
// interval followers track its direction but refuse to leap more than a
// whole step, and drones ignore it entirely. Together they give counterpoint
// rather than block harmony.
//
// Derivation is stateless: the only memory is the previous primary note the
// caller passes in (ConstraintEngine keeps it). Every result is clamped to
// the MIDI range.

use crate::pitch::clamp_wide_note;
use serde::{Deserialize, Serialize};

/// Anchor used by contrary and drone relations when none is configured.
pub const DEFAULT_ANCHOR: i32 = 60;

/// Largest step an interval follower may take per event, in semitones.
pub const FOLLOWER_MAX_STEP: i32 = 2;

/// How a secondary voice moves relative to the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Same direction, fixed interval.
    Parallel,
    /// Mirror image about the anchor note.
    Contrary,
    /// Follows at an interval, limited to stepwise motion.
    IntervalFollower,
    /// Holds the anchor note.
    Drone,
}

/// A secondary-voice rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceRelation {
    #[serde(rename = "type")]
    pub kind: RelationKind,
    /// Semitones, positive is up.
    #[serde(default)]
    pub interval: i32,
    /// Reference note for contrary motion and drones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_note: Option<i32>,
}

impl VoiceRelation {
    pub fn parallel(interval: i32) -> Self {
        VoiceRelation {
            kind: RelationKind::Parallel,
            interval,
            anchor_note: None,
        }
    }

    pub fn contrary(interval: i32, anchor_note: i32) -> Self {
        VoiceRelation {
            kind: RelationKind::Contrary,
            interval,
            anchor_note: Some(anchor_note),
        }
    }

    pub fn interval_follower(interval: i32) -> Self {
        VoiceRelation {
            kind: RelationKind::IntervalFollower,
            interval,
            anchor_note: None,
        }
    }

    pub fn drone(anchor_note: i32) -> Self {
        VoiceRelation {
            kind: RelationKind::Drone,
            interval: 0,
            anchor_note: Some(anchor_note),
        }
    }

    fn anchor(&self) -> i32 {
        self.anchor_note.unwrap_or(DEFAULT_ANCHOR)
    }
}

/// A fifth above, contrary motion about middle C, and a middle-C drone.
pub fn default_relations() -> Vec<VoiceRelation> {
    vec![
        VoiceRelation::parallel(7),
        VoiceRelation::contrary(0, 60),
        VoiceRelation::drone(60),
    ]
}

/// Derive one secondary note.
pub fn derive_voice(primary: u8, previous_primary: Option<u8>, relation: &VoiceRelation) -> u8 {
    let primary = i64::from(primary);
    let interval = i64::from(relation.interval);
    let result = match relation.kind {
        RelationKind::Parallel => primary + interval,
        RelationKind::Contrary => {
            let anchor = i64::from(relation.anchor());
            anchor - (primary - anchor) + interval
        }
        RelationKind::IntervalFollower => match previous_primary {
            None => primary + interval,
            Some(prev) => {
                let prev = i64::from(prev);
                let max_step = i64::from(FOLLOWER_MAX_STEP);
                let motion = (primary - prev).clamp(-max_step, max_step);
                prev + interval + motion
            }
        },
        RelationKind::Drone => i64::from(relation.anchor()),
    };
    clamp_wide_note(result)
}

/// One derived note per relation, in relation order.
pub fn derive_all_voices(
    primary: u8,
    previous_primary: Option<u8>,
    relations: &[VoiceRelation],
) -> Vec<u8> {
    relations
        .iter()
        .map(|rel| derive_voice(primary, previous_primary, rel))
        .collect()
}

/// True if the interval between two notes is a consonance: unison/octave,
/// thirds, fourth, fifth or sixths. Diagnostic only; derivation never
/// enforces it.
pub fn is_consonant(a: u8, b: u8) -> bool {
    let ic = (i32::from(a) - i32::from(b)).abs() % 12;
    matches!(ic, 0 | 3 | 4 | 5 | 7 | 8 | 9)
}
