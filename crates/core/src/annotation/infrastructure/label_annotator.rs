use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use super::bitmap_font;
use crate::annotation::domain::frame_annotator::{FrameAnnotator, TrackOverlay};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

const CONFIRMED_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const TENTATIVE_COLOR: Rgb<u8> = Rgb([255, 165, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

const BOX_THICKNESS: i32 = 2;
/// Padding around the caption inside the label bar, in scaled pixels.
const BAR_PADDING: u32 = 2;
/// Frame height covered by one unit of text scale.
const SCALE_STEP: u32 = 360;

/// Draws a box per live track (green once confirmed, orange while tentative)
/// with a filled caption bar above it.
#[derive(Default)]
pub struct LabelAnnotator {
    /// Fixed text scale; derived from frame height when `None`.
    text_scale: Option<u32>,
}

impl LabelAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_scale(scale: u32) -> Self {
        Self {
            text_scale: Some(scale.max(1)),
        }
    }

    fn scale_for(&self, frame_height: u32) -> u32 {
        self.text_scale
            .unwrap_or_else(|| (frame_height / SCALE_STEP).max(1))
    }
}

impl FrameAnnotator for LabelAnnotator {
    fn annotate(
        &mut self,
        frame: Frame,
        overlays: &[TrackOverlay],
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        if overlays.is_empty() {
            return Ok(frame);
        }
        let index = frame.index();
        let scale = self.scale_for(frame.height());
        let mut img = frame.into_rgb_image();

        for overlay in overlays {
            let color = if overlay.confirmed {
                CONFIRMED_COLOR
            } else {
                TENTATIVE_COLOR
            };
            let bbox = overlay.bbox.clamped(img.width(), img.height());
            if bbox.is_empty() {
                continue;
            }
            draw_box(&mut img, &bbox, color);
            draw_caption(&mut img, &bbox, &overlay.caption(), color, scale);
        }

        Ok(Frame::from_rgb_image(img, index))
    }
}

fn draw_box(img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    for inset in 0..BOX_THICKNESS {
        let w = bbox.width() - 2 * inset;
        let h = bbox.height() - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x1 + inset, bbox.y1 + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(img, rect, color);
    }
}

/// Label bar sits on top of the box, or just inside it when the box touches
/// the top edge of the frame.
fn draw_caption(img: &mut RgbImage, bbox: &BoundingBox, text: &str, color: Rgb<u8>, scale: u32) {
    let pad = BAR_PADDING * scale;
    let bar_w = bitmap_font::text_width(text, scale) + 2 * pad;
    let bar_h = bitmap_font::text_height(scale) + 2 * pad;

    let bar_y = if bbox.y1 >= bar_h as i32 {
        bbox.y1 - bar_h as i32
    } else {
        bbox.y1
    };
    let rect = Rect::at(bbox.x1, bar_y).of_size(bar_w, bar_h);
    draw_filled_rect_mut(img, rect, color);
    bitmap_font::draw_text(
        img,
        text,
        bbox.x1 + pad as i32,
        bar_y + pad as i32,
        TEXT_COLOR,
        scale,
    );
}
