use crate::shared::frame::Frame;
use crate::shared::labels::Prediction;

/// Predicts an age bucket and gender for a single face crop.
pub trait AgeGenderClassifier: Send {
    fn classify(&mut self, crop: &Frame) -> Result<Prediction, Box<dyn std::error::Error>>;
}
