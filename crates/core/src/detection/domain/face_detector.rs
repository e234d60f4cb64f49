use super::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for per-frame face detection with age/gender guesses.
///
/// Returns an empty list, not an error, when no face clears the confidence
/// threshold. Implementations may hold inference sessions, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
