use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Encodes annotated frames into an output video.
pub trait VideoWriter: Send {
    /// Creates `path`, sized and timed after `metadata`.
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes buffered frames and finalizes the container. The file is
    /// only complete once this returns `Ok`.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
