//! Alignment configuration.
//!
//! These are the knobs the alignment core consumes. `scene_threshold` is only
//! passed through to the scene source.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default beats per measure (4/4 time).
pub const DEFAULT_BEATS_PER_MEASURE: u32 = 4;
/// Default scene-change score threshold for the scene source.
pub const DEFAULT_SCENE_THRESHOLD: f64 = 0.3;

/// Invalid configuration, reported before any alignment work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("beats per measure must be at least 1, got {0}")]
    InvalidBeatsPerMeasure(u32),

    #[error("max scene measures must be at least 1 when set, got {0}")]
    InvalidMaxSceneMeasures(u32),

    #[error("scene threshold must be in (0, 1], got {0}")]
    InvalidSceneThreshold(f64),
}

/// Configuration for measure filtering and scene alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlignConfig {
    /// Beats grouped into one measure; every Nth beat is a downbeat.
    #[serde(default = "default_beats_per_measure")]
    pub beats_per_measure: u32,

    /// Longest a scene may run, in measures, before it is split.
    /// `None` means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scene_measures: Option<u32>,

    /// Scene-change sensitivity (0.0-1.0, lower detects more cuts).
    #[serde(default = "default_scene_threshold")]
    pub scene_threshold: f64,
}

fn default_beats_per_measure() -> u32 {
    DEFAULT_BEATS_PER_MEASURE
}

fn default_scene_threshold() -> f64 {
    DEFAULT_SCENE_THRESHOLD
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            beats_per_measure: DEFAULT_BEATS_PER_MEASURE,
            max_scene_measures: None,
            scene_threshold: DEFAULT_SCENE_THRESHOLD,
        }
    }
}

impl AlignConfig {
    /// Builder-style setter for beats per measure.
    pub fn with_beats_per_measure(mut self, beats: u32) -> Self {
        self.beats_per_measure = beats;
        self
    }

    /// Builder-style setter for the scene length limit.
    pub fn with_max_scene_measures(mut self, max: Option<u32>) -> Self {
        self.max_scene_measures = max;
        self
    }

    /// Builder-style setter for the scene threshold.
    pub fn with_scene_threshold(mut self, threshold: f64) -> Self {
        self.scene_threshold = threshold;
        self
    }

    /// Check every field. Fails on the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.beats_per_measure < 1 {
            return Err(ConfigError::InvalidBeatsPerMeasure(self.beats_per_measure));
        }
        if let Some(max) = self.max_scene_measures {
            if max < 1 {
                return Err(ConfigError::InvalidMaxSceneMeasures(max));
            }
        }
        if !(self.scene_threshold > 0.0 && self.scene_threshold <= 1.0) {
            return Err(ConfigError::InvalidSceneThreshold(self.scene_threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AlignConfig::default();
        assert_eq!(config.beats_per_measure, 4);
        assert_eq!(config.max_scene_measures, None);
        assert!((config.scene_threshold - 0.3).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_beats_per_measure_rejected() {
        let config = AlignConfig::default().with_beats_per_measure(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBeatsPerMeasure(0))
        );
    }

    #[test]
    fn test_zero_max_scene_measures_rejected() {
        let config = AlignConfig::default().with_max_scene_measures(Some(0));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidMaxSceneMeasures(0))
        );

        let config = AlignConfig::default().with_max_scene_measures(Some(16));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(AlignConfig::default().with_scene_threshold(0.0).validate().is_err());
        assert!(AlignConfig::default().with_scene_threshold(1.5).validate().is_err());
        assert!(AlignConfig::default().with_scene_threshold(f64::NAN).validate().is_err());
        assert!(AlignConfig::default().with_scene_threshold(1.0).validate().is_ok());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: AlignConfig = serde_json::from_str(r#"{"max_scene_measures": 8}"#).unwrap();
        assert_eq!(config.beats_per_measure, 4);
        assert_eq!(config.max_scene_measures, Some(8));
    }
}
