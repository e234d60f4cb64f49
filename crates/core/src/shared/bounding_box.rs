/// Axis-aligned box in frame pixel coordinates.
///
/// `x2`/`y2` are exclusive, so `width = x2 - x1`. Boxes produced by the
/// detection layer are already padded and clamped to the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rounds floating-point model output outward to whole pixels.
    pub fn from_f64(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.floor() as i32,
            y1: y1.floor() as i32,
            x2: x2.ceil() as i32,
            y2: y2.ceil() as i32,
        }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// Intersection-over-union; 0.0 when either box is degenerate.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let union = self.area() as f64 + other.area() as f64 - inter;
        inter / union
    }

    /// Grows the box by `padding` on every side, then clamps it to a
    /// `frame_width` x `frame_height` frame.
    pub fn padded(&self, padding: u32, frame_width: u32, frame_height: u32) -> BoundingBox {
        let p = padding as i32;
        BoundingBox {
            x1: self.x1 - p,
            y1: self.y1 - p,
            x2: self.x2 + p,
            y2: self.y2 + p,
        }
        .clamped(frame_width, frame_height)
    }

    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> BoundingBox {
        let fw = frame_width as i32;
        let fh = frame_height as i32;
        let x1 = self.x1.clamp(0, fw);
        let y1 = self.y1.clamp(0, fh);
        BoundingBox {
            x1,
            y1,
            x2: self.x2.clamp(x1, fw),
            y2: self.y2.clamp(y1, fh),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn bbox(x1: i32, y1: i32, x2: i32, y2: i32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    // ── IoU ──────────────────────────────────────────────────────────

    #[test]
    fn test_iou_identical() {
        let a = bbox(10, 10, 110, 110);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // intersection 50x100 = 5000, union 10000 + 10000 - 5000
        let a = bbox(0, 0, 100, 100);
        let b = bbox(50, 0, 150, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_contained() {
        let a = bbox(0, 0, 100, 100);
        let b = bbox(25, 25, 75, 75);
        assert_relative_eq!(a.iou(&b), 2500.0 / 10000.0);
    }

    #[test]
    fn test_iou_is_symmetric() {
        let a = bbox(0, 0, 40, 60);
        let b = bbox(10, 20, 70, 90);
        assert_relative_eq!(a.iou(&b), b.iou(&a));
    }

    #[rstest]
    #[case::disjoint(bbox(0, 0, 50, 50), bbox(100, 100, 150, 150))]
    #[case::touching_edges(bbox(0, 0, 50, 50), bbox(50, 0, 100, 50))]
    #[case::zero_width(bbox(0, 0, 0, 100), bbox(0, 0, 50, 50))]
    #[case::inverted(bbox(50, 50, 10, 10), bbox(0, 0, 60, 60))]
    fn test_iou_zero(#[case] a: BoundingBox, #[case] b: BoundingBox) {
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    // ── Geometry ─────────────────────────────────────────────────────

    #[test]
    fn test_inverted_box_has_no_area() {
        let b = bbox(10, 10, 5, 5);
        assert_eq!(b.width(), 0);
        assert_eq!(b.height(), 0);
        assert!(b.is_empty());
    }

    #[test]
    fn test_from_f64_rounds_outward() {
        let b = BoundingBox::from_f64(10.7, 20.2, 30.1, 40.9);
        assert_eq!(b, bbox(10, 20, 31, 41));
    }

    // ── Padding / clamping ───────────────────────────────────────────

    #[rstest]
    #[case::interior(bbox(50, 30, 100, 60), 20, bbox(30, 10, 120, 80))]
    #[case::clipped_at_bottom(bbox(50, 50, 100, 100), 20, bbox(30, 30, 120, 100))]
    #[case::top_left_corner(bbox(5, 5, 40, 40), 20, bbox(0, 0, 60, 60))]
    #[case::bottom_right_corner(bbox(180, 90, 200, 100), 20, bbox(160, 70, 200, 100))]
    #[case::zero_padding(bbox(10, 10, 20, 20), 0, bbox(10, 10, 20, 20))]
    fn test_padded(#[case] input: BoundingBox, #[case] padding: u32, #[case] expected: BoundingBox) {
        assert_eq!(input.padded(padding, 200, 100), expected);
    }

    #[test]
    fn test_clamped_fully_outside_is_empty() {
        let b = bbox(300, 300, 400, 400).clamped(200, 100);
        assert!(b.is_empty());
        assert!(b.x2 <= 200 && b.y2 <= 100);
    }
}
