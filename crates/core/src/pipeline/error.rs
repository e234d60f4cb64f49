use std::path::PathBuf;

use thiserror::Error;

/// A configuration value outside its valid range.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },
    #[error("frames_to_stabilize must be at least 1")]
    ZeroStabilizeWindow,
}

/// Fatal outcome of a processing run. When any of these is returned the
/// output video does not exist and nothing was written to the store.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot read input video {path}: {source}")]
    Input {
        path: PathBuf,
        source: Box<dyn std::error::Error>,
    },

    #[error("cannot write output video {path}: {source}")]
    Output {
        path: PathBuf,
        source: Box<dyn std::error::Error>,
    },

    #[error("processing cancelled")]
    Cancelled,
}
