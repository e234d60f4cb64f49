/// Greedy IoU tracker that owns every live [`Track`] of one run.
///
/// Per frame, every (track, detection) pair whose IoU exceeds `min_iou` is
/// ranked by descending IoU and accepted greedily, each track and each
/// detection at most once. Equal scores keep generation order: older track
/// first, then lower detection index. Unmatched detections start new tracks
/// and unmatched tracks age out after `max_track_age` missed frames.
use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::track::Track;
use crate::detection::domain::detection::Detection;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::labels::Prediction;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerConfig {
    pub min_iou: f64,
    pub max_track_age: usize,
    pub frames_to_stabilize: usize,
}

/// Emitted once per track, on the frame whose observation fills its window.
#[derive(Clone, Debug, PartialEq)]
pub struct Confirmation {
    pub track_id: u64,
    pub label: Prediction,
    /// Box of the detection that triggered confirmation.
    pub bbox: BoundingBox,
    pub first_seen: DateTime<Utc>,
    pub first_frame: usize,
}

/// Result of one [`Tracker::update`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameUpdate {
    pub matched: usize,
    pub created: usize,
    pub removed: usize,
    pub confirmations: Vec<Confirmation>,
}

pub struct Tracker {
    tracks: Vec<Track>,
    next_id: u64,
    config: TrackerConfig,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            config,
        }
    }

    pub fn update(&mut self, detections: &[Detection], frame_index: usize) -> FrameUpdate {
        let mut result = FrameUpdate::default();
        let num_existing = self.tracks.len();

        let matches = greedy_match(&self.tracks, detections, self.config.min_iou);
        let mut matched_tracks = HashSet::new();
        let mut matched_dets = HashSet::new();

        for (ti, di) in matches {
            matched_tracks.insert(ti);
            matched_dets.insert(di);
            let det = &detections[di];
            let track = &mut self.tracks[ti];
            if let Some(label) = track.observe(det.bbox, det.prediction.clone()) {
                result.confirmations.push(confirmation(track, label, det.bbox));
            }
        }
        result.matched = matched_tracks.len();

        let now = Utc::now();
        for (di, det) in detections.iter().enumerate() {
            if matched_dets.contains(&di) {
                continue;
            }
            let (track, label) = Track::start(
                self.next_id,
                det.bbox,
                det.prediction.clone(),
                self.config.frames_to_stabilize,
                frame_index,
                now,
            );
            self.next_id += 1;
            if let Some(label) = label {
                result.confirmations.push(confirmation(&track, label, det.bbox));
            }
            self.tracks.push(track);
            result.created += 1;
        }

        for (ti, track) in self.tracks.iter_mut().take(num_existing).enumerate() {
            if !matched_tracks.contains(&ti) {
                track.mark_missed();
            }
        }
        let before = self.tracks.len();
        let max_age = self.config.max_track_age;
        self.tracks.retain(|t| t.frames_since_seen() <= max_age);
        result.removed = before - self.tracks.len();

        for c in &result.confirmations {
            log::debug!("Track {} confirmed as {}", c.track_id, c.label);
        }
        result
    }

    /// Live tracks, oldest first.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

fn confirmation(track: &Track, label: Prediction, bbox: BoundingBox) -> Confirmation {
    Confirmation {
        track_id: track.id(),
        label,
        bbox,
        first_seen: track.first_seen(),
        first_frame: track.first_frame(),
    }
}

/// Greedy IoU matching: pairs above `min_iou` sorted by descending IoU, each
/// track/detection used at most once. The sort is stable, so ties resolve in
/// generation order.
fn greedy_match(tracks: &[Track], dets: &[Detection], min_iou: f64) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (ti, track) in tracks.iter().enumerate() {
        let last = track.last_box();
        for (di, det) in dets.iter().enumerate() {
            let score = last.iou(&det.bbox);
            if score > min_iou {
                pairs.push((ti, di, score));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();

    for (ti, di, _) in pairs {
        if !used_tracks.contains(&ti) && !used_dets.contains(&di) {
            used_tracks.insert(ti);
            used_dets.insert(di);
            matches.push((ti, di));
        }
    }
    matches
}
