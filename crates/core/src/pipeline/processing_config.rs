use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::shared::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_FRAMES_TO_STABILIZE, DEFAULT_MAX_TRACK_AGE, DEFAULT_MIN_IOU,
    DEFAULT_PADDING,
};
use crate::tracking::domain::tracker::TrackerConfig;

/// Per-run tuning. Read once when a run starts and never changed during it.
///
/// `conf_threshold` and `padding` configure the detector, which is built
/// before the run (see `AgeGenderDetector::from_config`). The use case still
/// validates them so a bad value fails before any video is opened.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Minimum face detector score.
    pub conf_threshold: f64,
    /// Pixels added on each side of a face box before classification.
    pub padding: u32,
    pub frames_to_stabilize: usize,
    pub max_track_age: usize,
    /// Association threshold; a pair must score strictly above it.
    pub min_iou: f64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            conf_threshold: DEFAULT_CONFIDENCE,
            padding: DEFAULT_PADDING,
            frames_to_stabilize: DEFAULT_FRAMES_TO_STABILIZE,
            max_track_age: DEFAULT_MAX_TRACK_AGE,
            min_iou: DEFAULT_MIN_IOU,
        }
    }
}

impl ProcessingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_range("conf_threshold", self.conf_threshold)?;
        unit_range("min_iou", self.min_iou)?;
        if self.frames_to_stabilize == 0 {
            return Err(ConfigError::ZeroStabilizeWindow);
        }
        Ok(())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            min_iou: self.min_iou,
            max_track_age: self.max_track_age,
            frames_to_stabilize: self.frames_to_stabilize,
        }
    }
}

fn unit_range(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = ProcessingConfig::default();
        assert_eq!(config.padding, 20);
        assert_eq!(config.frames_to_stabilize, 3);
        assert_eq!(config.max_track_age, 5);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case::negative_confidence(-0.1, 0.3)]
    #[case::confidence_above_one(1.5, 0.3)]
    #[case::nan_confidence(f64::NAN, 0.3)]
    #[case::iou_above_one(0.5, 1.01)]
    fn test_rejects_out_of_range(#[case] conf_threshold: f64, #[case] min_iou: f64) {
        let config = ProcessingConfig {
            conf_threshold,
            min_iou,
            ..ProcessingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfUnitRange { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_window() {
        let config = ProcessingConfig {
            frames_to_stabilize: 0,
            ..ProcessingConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroStabilizeWindow));
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.0)]
    fn test_accepts_range_bounds(#[case] value: f64) {
        let config = ProcessingConfig {
            conf_threshold: value,
            min_iou: value,
            ..ProcessingConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tracker_config_carries_fields() {
        let config = ProcessingConfig {
            min_iou: 0.4,
            max_track_age: 9,
            frames_to_stabilize: 2,
            ..ProcessingConfig::default()
        };
        let t = config.tracker_config();
        assert_eq!(t.min_iou, 0.4);
        assert_eq!(t.max_track_age, 9);
        assert_eq!(t.frames_to_stabilize, 2);
    }
}
