use ndarray::{s, ArrayView3};

use super::bounding_box::BoundingBox;

/// A decoded video frame (or face crop): tightly packed RGB24, row-major.
///
/// Codec-specific layouts are converted at the I/O boundary; everything in
/// between treats the pixel buffer as opaque RGB.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

pub const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// Solid-colour frame, mostly useful for tests and placeholders.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self::new(data, width, height, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Zero-based decode order within the source video.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels under `bbox` (clamped to this frame) into a new frame
    /// that keeps this frame's index.
    pub fn crop(&self, bbox: &BoundingBox) -> Frame {
        let b = bbox.clamped(self.width, self.height);
        let (x1, y1, x2, y2) = (b.x1 as usize, b.y1 as usize, b.x2 as usize, b.y2 as usize);

        let view = self.as_ndarray();
        let region = view.slice(s![y1..y2, x1..x2, ..]);
        let data: Vec<u8> = region.iter().copied().collect();

        Frame::new(data, (x2 - x1) as u32, (y2 - y1) as u32, self.index)
    }

    pub fn to_rgb_image(&self) -> image::RgbImage {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("Frame data length must match dimensions")
    }

    /// Hands the pixel buffer to `image` without copying.
    pub fn into_rgb_image(self) -> image::RgbImage {
        let (width, height) = (self.width, self.height);
        image::RgbImage::from_raw(width, height, self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn from_rgb_image(img: image::RgbImage, index: usize) -> Frame {
        let (width, height) = img.dimensions();
        Frame::new(img.into_raw(), width, height, index)
    }
}
