use std::path::PathBuf;

use super::constants::FALLBACK_FPS;

/// Stream properties of a source video, as reported by the demuxer.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container estimate; 0 when the container does not say.
    pub total_frames: usize,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Frame rate for the output stream. Containers that report no usable
    /// rate (0, negative, NaN) get the fallback.
    pub fn output_fps(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            FALLBACK_FPS
        }
    }

    /// Presentation time of `frame_index`, in seconds from stream start.
    pub fn timestamp_of(&self, frame_index: usize) -> f64 {
        frame_index as f64 / self.output_fps()
    }
}
