use super::detection::FaceBox;
use crate::shared::frame::Frame;

/// Finds face boxes in a frame, in frame pixel coordinates.
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;
}
