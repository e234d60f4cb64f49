use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use facecensus_core::pipeline::processing_config::ProcessingConfig;
use facecensus_core::shared::constants::{
    APP_DIR_NAME, DEFAULT_AGE_BUCKETS, DEFAULT_CONFIDENCE, DEFAULT_FRAMES_TO_STABILIZE,
    DEFAULT_MAX_TRACK_AGE, DEFAULT_MIN_IOU, DEFAULT_PADDING,
};
use facecensus_core::shared::labels::AgeBucket;

const SETTINGS_FILE_NAME: &str = "settings.json";
const OUTPUTS_DIR_NAME: &str = "outputs";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not determine a data directory; pass --data-dir")]
    NoDataDir,
}

/// User settings, read once at startup. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub confidence: f64,
    pub padding: u32,
    pub frames_to_stabilize: usize,
    pub max_track_age: usize,
    pub min_iou: f64,
    /// Catalog and face crops; platform data dir when unset.
    pub data_dir: Option<PathBuf>,
    /// Annotated videos; `<data_dir>/outputs` when unset.
    pub output_dir: Option<PathBuf>,
    /// Model cache; platform cache dir when unset.
    pub models_dir: Option<PathBuf>,
    /// Labels of the age model's output head, in order.
    pub age_buckets: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            padding: DEFAULT_PADDING,
            frames_to_stabilize: DEFAULT_FRAMES_TO_STABILIZE,
            max_track_age: DEFAULT_MAX_TRACK_AGE,
            min_iou: DEFAULT_MIN_IOU,
            data_dir: None,
            output_dir: None,
            models_dir: None,
            age_buckets: DEFAULT_AGE_BUCKETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Loads `explicit` if given (it must exist), else the per-user settings
    /// file if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn processing_config(&self) -> ProcessingConfig {
        ProcessingConfig {
            conf_threshold: self.confidence,
            padding: self.padding,
            frames_to_stabilize: self.frames_to_stabilize,
            max_track_age: self.max_track_age,
            min_iou: self.min_iou,
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, SettingsError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR_NAME))
                .ok_or(SettingsError::NoDataDir),
        }
    }

    pub fn output_dir(&self) -> Result<PathBuf, SettingsError> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_dir()?.join(OUTPUTS_DIR_NAME)),
        }
    }

    pub fn age_buckets(&self) -> Vec<AgeBucket> {
        self.age_buckets.iter().map(AgeBucket::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_processing_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.processing_config(), ProcessingConfig::default());
        assert_eq!(settings.age_buckets.len(), 8);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{ "padding": 8, "data_dir": "/srv/census" }"#).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.padding, 8);
        assert_eq!(settings.data_dir, Some(PathBuf::from("/srv/census")));
        assert_eq!(settings.frames_to_stabilize, DEFAULT_FRAMES_TO_STABILIZE);
        assert_eq!(
            settings.output_dir().unwrap(),
            PathBuf::from("/srv/census/outputs")
        );
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ padding: ").unwrap();
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.json");
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(SettingsError::Read { .. })
        ));
    }

    #[test]
    fn test_custom_age_buckets() {
        let settings = Settings {
            age_buckets: vec!["young".into(), "old".into()],
            ..Settings::default()
        };
        let buckets = settings.age_buckets();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[1].as_str(), "old");
    }
}
