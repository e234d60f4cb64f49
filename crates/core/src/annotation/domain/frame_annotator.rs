use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::labels::Prediction;
use crate::tracking::domain::track::Track;

/// What to draw for one live track.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackOverlay {
    pub track_id: u64,
    pub bbox: BoundingBox,
    pub label: Prediction,
    pub confirmed: bool,
}

impl From<&Track> for TrackOverlay {
    fn from(track: &Track) -> Self {
        Self {
            track_id: track.id(),
            bbox: track.last_box(),
            label: track.display_label().clone(),
            confirmed: track.is_confirmed(),
        }
    }
}

impl TrackOverlay {
    /// Burned-in caption, e.g. `ID:3 MALE (25-32)`.
    pub fn caption(&self) -> String {
        format!("ID:{} {} {}", self.track_id, self.label.gender, self.label.age).to_uppercase()
    }
}

/// Draws track boxes and labels onto a frame before it is encoded.
pub trait FrameAnnotator: Send {
    fn annotate(
        &mut self,
        frame: Frame,
        overlays: &[TrackOverlay],
    ) -> Result<Frame, Box<dyn std::error::Error>>;
}
