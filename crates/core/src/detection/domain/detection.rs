use crate::shared::bounding_box::BoundingBox;
use crate::shared::labels::Prediction;

/// A face found in one frame, with its per-frame age/gender guess.
///
/// `bbox` is already padded and clamped to the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub prediction: Prediction,
    pub confidence: f64,
}

impl Detection {
    pub fn new(bbox: BoundingBox, prediction: Prediction, confidence: f64) -> Self {
        Self {
            bbox,
            prediction,
            confidence,
        }
    }
}

/// A located face before classification: raw model box and score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub bbox: BoundingBox,
    pub confidence: f64,
}
