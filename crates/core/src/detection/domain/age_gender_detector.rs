use super::age_gender_classifier::AgeGenderClassifier;
use super::detection::Detection;
use super::face_detector::FaceDetector;
use super::face_locator::FaceLocator;
use crate::pipeline::processing_config::ProcessingConfig;
use crate::shared::frame::Frame;

/// [`FaceDetector`] built from a locator and a classifier.
///
/// Each located box is grown by `padding` pixels per side and clamped to the
/// frame. The padded crop is what gets classified, and the padded box is what
/// the tracker sees. A face the classifier fails on is skipped with a warning;
/// the other faces in the frame are still returned.
pub struct AgeGenderDetector {
    locator: Box<dyn FaceLocator>,
    classifier: Box<dyn AgeGenderClassifier>,
    padding: u32,
}

impl AgeGenderDetector {
    pub fn new(
        locator: Box<dyn FaceLocator>,
        classifier: Box<dyn AgeGenderClassifier>,
        padding: u32,
    ) -> Self {
        Self {
            locator,
            classifier,
            padding,
        }
    }

    /// Uses the padding from `config`. The locator is expected to have been
    /// built with `config.conf_threshold`.
    pub fn from_config(
        locator: Box<dyn FaceLocator>,
        classifier: Box<dyn AgeGenderClassifier>,
        config: &ProcessingConfig,
    ) -> Self {
        Self::new(locator, classifier, config.padding)
    }
}

impl FaceDetector for AgeGenderDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let faces = self.locator.locate(frame)?;
        let mut detections = Vec::with_capacity(faces.len());

        for face in faces {
            let bbox = face.bbox.padded(self.padding, frame.width(), frame.height());
            if bbox.is_empty() {
                continue;
            }
            let crop = frame.crop(&bbox);
            let prediction = match self.classifier.classify(&crop) {
                Ok(prediction) => prediction,
                Err(e) => {
                    log::warn!("Skipping face at {bbox:?}: {e}");
                    continue;
                }
            };
            detections.push(Detection::new(bbox, prediction, face.confidence));
        }

        Ok(detections)
    }
}
