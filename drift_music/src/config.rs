// Data-driven pipeline configuration.
//
// `EngineConfig` groups the parameters of every pipeline stage (tonal field,
// gravity, phrase memory, voice relations) plus the `enabled` master flag,
// which the engine itself never reads: it tells the caller whether to route
// positions through the engine or through the direct scale mapping in
// `scale.rs`. `DriftConfig` adds the clock parameters and is what the
// `perform` binary loads from JSON.
//
// Runtime updates go through patches. Every group has a patch struct with an
// `Option` per key, and `EngineConfig::merged` folds a patch in group by group
// and key by key, returning a new value. Updating the gravity root therefore
// leaves the tonal field and the rest of the gravity group untouched.
//
// Validation happens here, once, when a config is built or merged. The
// pipeline itself never fails; anything it can silently clamp (strength,
// swing, tempo) is clamped at use instead of being rejected.

use crate::clock::SchedulerConfig;
use crate::gravity::{GravityConfig, GravityPatch};
use crate::phrase::{PhraseConfig, PhrasePatch};
use crate::tonal_field::{TonalFieldConfig, TonalFieldPatch};
use crate::voice::VoiceRelation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A configuration the pipeline cannot run with.
#[derive(Debug)]
pub enum ConfigError {
    /// `phrase.max_length` was zero; the phrase buffer needs room for one event.
    ZeroPhraseLength,
    /// A floating-point parameter was NaN or infinite.
    NonFinite { field: &'static str },
    /// The JSON could not be parsed into a config.
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroPhraseLength => write!(f, "phrase.max_length must be at least 1"),
            ConfigError::NonFinite { field } => write!(f, "{field} must be a finite number"),
            ConfigError::Json(e) => write!(f, "invalid config JSON: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// Parameters for the whole note-generation pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tonal_field: TonalFieldConfig,
    pub gravity: GravityConfig,
    pub phrase: PhraseConfig,
    pub voice_relations: Vec<VoiceRelation>,
    /// Master toggle read by the caller, not by the engine.
    pub enabled: bool,
}

/// Partial update for `EngineConfig`. Groups left `None` are untouched;
/// `voice_relations` replaces the whole list when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfigPatch {
    pub tonal_field: Option<TonalFieldPatch>,
    pub gravity: Option<GravityPatch>,
    pub phrase: Option<PhrasePatch>,
    pub voice_relations: Option<Vec<VoiceRelation>>,
    pub enabled: Option<bool>,
}

impl EngineConfig {
    /// Return a new config with `patch` merged in group by group.
    pub fn merged(&self, patch: &EngineConfigPatch) -> EngineConfig {
        EngineConfig {
            tonal_field: match &patch.tonal_field {
                Some(p) => self.tonal_field.merged(p),
                None => self.tonal_field.clone(),
            },
            gravity: match &patch.gravity {
                Some(p) => self.gravity.merged(p),
                None => self.gravity.clone(),
            },
            phrase: match &patch.phrase {
                Some(p) => self.phrase.merged(p),
                None => self.phrase.clone(),
            },
            voice_relations: patch
                .voice_relations
                .clone()
                .unwrap_or_else(|| self.voice_relations.clone()),
            enabled: patch.enabled.unwrap_or(self.enabled),
        }
    }

    /// Reject configurations that cannot be clamped into something sensible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phrase.max_length == 0 {
            return Err(ConfigError::ZeroPhraseLength);
        }
        let floats = [
            ("gravity.gravity_strength", self.gravity.gravity_strength),
            ("phrase.variation_amount", self.phrase.variation_amount),
            ("phrase.similarity_threshold", self.phrase.similarity_threshold),
        ];
        for (field, value) in floats {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
        }
        Ok(())
    }
}

/// Everything the `perform` binary needs: pipeline plus clock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub engine: EngineConfig,
    pub clock: SchedulerConfig,
}

impl DriftConfig {
    /// Parse and validate a JSON config. Omitted groups and keys take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DriftConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&data)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        let floats = [
            ("clock.bpm", self.clock.bpm),
            ("clock.lookahead_ms", self.clock.lookahead_ms),
            ("clock.swing_amount", self.clock.swing_amount),
        ];
        for (field, value) in floats {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::RelationKind;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tonal_field.root_note, 60);
        assert_eq!(config.tonal_field.octave_range, 3);
        assert_eq!(config.gravity.gravity_strength, 0.6);
        assert_eq!(config.phrase.max_length, 16);
        assert!(config.voice_relations.is_empty());
        assert!(!config.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_preserves_siblings() {
        let base = EngineConfig::default();
        let merged = base.merged(&EngineConfigPatch {
            gravity: Some(GravityPatch {
                root_note: Some(48),
                gravity_strength: Some(1.0),
            }),
            ..Default::default()
        });
        assert_eq!(merged.gravity.root_note, 48);
        assert_eq!(merged.gravity.gravity_strength, 1.0);
        assert_eq!(merged.tonal_field, base.tonal_field);
        assert_eq!(merged.phrase, base.phrase);
        // The base config is untouched.
        assert_eq!(base.gravity.root_note, 60);
    }

    #[test]
    fn test_merge_is_key_by_key() {
        let merged = EngineConfig::default().merged(&EngineConfigPatch {
            phrase: Some(PhrasePatch {
                variation_amount: Some(5.0),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(merged.phrase.variation_amount, 5.0);
        assert_eq!(merged.phrase.max_length, 16);
        assert_eq!(merged.phrase.similarity_threshold, 0.85);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.phrase.max_length = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPhraseLength)));

        let mut config = EngineConfig::default();
        config.gravity.gravity_strength = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFinite {
                field: "gravity.gravity_strength"
            })
        ));
    }

    #[test]
    fn test_out_of_range_strength_is_not_an_error() {
        let mut config = EngineConfig::default();
        config.gravity.gravity_strength = 3.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "engine": {
                "gravity": { "root_note": 62 },
                "voice_relations": [
                    { "type": "parallel", "interval": 7 },
                    { "type": "drone", "anchor_note": 48 }
                ],
                "enabled": true
            },
            "clock": { "bpm": 90 }
        }"#;
        let config = DriftConfig::from_json(json).unwrap();
        assert_eq!(config.engine.gravity.root_note, 62);
        assert_eq!(config.engine.gravity.gravity_strength, 0.6);
        assert_eq!(config.engine.voice_relations.len(), 2);
        assert_eq!(config.engine.voice_relations[1].kind, RelationKind::Drone);
        assert_eq!(config.engine.voice_relations[1].anchor_note, Some(48));
        assert!(config.engine.enabled);
        assert_eq!(config.clock.bpm, 90.0);
        assert_eq!(config.clock.subdivision, 2);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(DriftConfig::from_json("{}").unwrap(), DriftConfig::default());
    }

    #[test]
    fn test_malformed_json() {
        let err = DriftConfig::from_json(r#"{"engine": {"voice_relations": [{"type": "canon"}]}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("invalid config JSON"));
    }

    #[test]
    fn test_zero_length_json_rejected() {
        let err = DriftConfig::from_json(r#"{"engine": {"phrase": {"max_length": 0}}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroPhraseLength));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift.json");
        std::fs::write(&path, r#"{"clock": {"subdivision": 4}}"#).unwrap();
        let config = DriftConfig::load(&path).unwrap();
        assert_eq!(config.clock.subdivision, 4);
        assert!(DriftConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
