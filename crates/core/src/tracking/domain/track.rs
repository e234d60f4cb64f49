use chrono::{DateTime, Utc};

use super::stabilizer::Stabilizer;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::labels::Prediction;

/// One physical face followed across frames.
#[derive(Clone, Debug)]
pub struct Track {
    id: u64,
    last_box: BoundingBox,
    frames_since_seen: usize,
    stabilizer: Stabilizer,
    last_prediction: Prediction,
    first_seen: DateTime<Utc>,
    first_frame: usize,
}

impl Track {
    /// Starts a track from its first detection. The first prediction is
    /// already in the window, so a one-entry window confirms here; the
    /// returned label is `Some` in exactly that case.
    pub fn start(
        id: u64,
        bbox: BoundingBox,
        prediction: Prediction,
        window: usize,
        first_frame: usize,
        first_seen: DateTime<Utc>,
    ) -> (Self, Option<Prediction>) {
        let mut track = Self {
            id,
            last_box: bbox,
            frames_since_seen: 0,
            stabilizer: Stabilizer::new(window),
            last_prediction: prediction.clone(),
            first_seen,
            first_frame,
        };
        let confirmed = track.stabilizer.record(prediction);
        (track, confirmed)
    }

    /// Extends the track with a matched detection. Returns the confirmed
    /// label on the observation that completes the window.
    pub fn observe(&mut self, bbox: BoundingBox, prediction: Prediction) -> Option<Prediction> {
        self.last_box = bbox;
        self.frames_since_seen = 0;
        self.last_prediction = prediction.clone();
        self.stabilizer.record(prediction)
    }

    pub fn mark_missed(&mut self) {
        self.frames_since_seen += 1;
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn last_box(&self) -> BoundingBox {
        self.last_box
    }

    pub fn frames_since_seen(&self) -> usize {
        self.frames_since_seen
    }

    pub fn is_confirmed(&self) -> bool {
        self.stabilizer.is_confirmed()
    }

    pub fn confirmed(&self) -> Option<&Prediction> {
        self.stabilizer.confirmed()
    }

    pub fn window(&self) -> &[Prediction] {
        self.stabilizer.window()
    }

    /// Label to show for this track: the frozen one once confirmed, the
    /// latest raw prediction before that.
    pub fn display_label(&self) -> &Prediction {
        self.stabilizer.confirmed().unwrap_or(&self.last_prediction)
    }

    pub fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    pub fn first_frame(&self) -> usize {
        self.first_frame
    }
}
