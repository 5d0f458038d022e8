/// Which convention a region's numbers are expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinateSpace {
    /// Absolute pixels relative to the frame's top-left corner.
    Pixel,
    /// Fractions of the frame's width and height, in `[0, 1]`.
    Normalized,
}

/// A point in absolute pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in absolute pixel coordinates.
///
/// Width and height are never negative; the origin may lie outside the
/// frame (cascade and remote detections can extend past an edge), which
/// is why anything that slices pixels goes through [`PixelRegion::clip_to`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(0),
            height: height.max(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Center as `(x + 0.5w, y + 0.5h)`, truncated toward zero.
    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width as f64 * 0.5) as i32,
            self.y + (self.height as f64 * 0.5) as i32,
        )
    }

    pub fn offset(&self, dx: i32, dy: i32) -> PixelRegion {
        PixelRegion::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Intersects the region with a `frame_w` x `frame_h` frame.
    ///
    /// Returns `None` when nothing of the region is visible.
    pub fn clip_to(&self, frame_w: u32, frame_h: u32) -> Option<PixelRegion> {
        if self.is_empty() {
            return None;
        }
        let fw = i64::from(frame_w);
        let fh = i64::from(frame_h);

        let x1 = i64::from(self.x).clamp(0, fw);
        let y1 = i64::from(self.y).clamp(0, fh);
        let x2 = (i64::from(self.x) + i64::from(self.width)).clamp(0, fw);
        let y2 = (i64::from(self.y) + i64::from(self.height)).clamp(0, fh);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(PixelRegion::new(
            x1 as i32,
            y1 as i32,
            (x2 - x1) as i32,
            (y2 - y1) as i32,
        ))
    }
}

/// Axis-aligned rectangle as fractions of the frame size.
///
/// Construction clips the edges to the unit square, so every value is in
/// `[0, 1]` and `left + width`, `top + height` never exceed 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedRegion {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRegion {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        let (left, width) = clip_span(left, width);
        let (top, height) = clip_span(top, height);
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Clips `[start, start + len]` to `[0, 1]`, leaving in-range spans untouched.
fn clip_span(start: f64, len: f64) -> (f64, f64) {
    let start = if start.is_nan() { 0.0 } else { start };
    let len = if len.is_nan() { 0.0 } else { len.max(0.0) };
    if start >= 0.0 && start + len <= 1.0 {
        return (start, len);
    }
    let s = start.clamp(0.0, 1.0);
    let e = (start + len).clamp(0.0, 1.0);
    (s, (e - s).max(0.0))
}

/// A detected rectangle tagged with the coordinate space it was produced in.
///
/// Local cascades emit [`Region::Pixel`], the remote classifier emits
/// [`Region::Normalized`]; drawing and slicing only ever consume pixels, so
/// the conversion happens once via [`Region::to_pixels`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Region {
    Pixel(PixelRegion),
    Normalized(NormalizedRegion),
}

impl Region {
    pub fn space(&self) -> CoordinateSpace {
        match self {
            Region::Pixel(_) => CoordinateSpace::Pixel,
            Region::Normalized(_) => CoordinateSpace::Normalized,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Region::Pixel(r) => r.is_empty(),
            Region::Normalized(r) => r.is_empty(),
        }
    }

    pub fn to_pixels(&self, frame_w: u32, frame_h: u32) -> PixelRegion {
        match self {
            Region::Pixel(r) => *r,
            Region::Normalized(r) => normalized_to_absolute(r, frame_w, frame_h),
        }
    }
}

/// Maps a normalized region onto a `frame_w` x `frame_h` frame.
///
/// Every component is truncated toward zero (`x = ⌊left·W⌋`,
/// `w = ⌊width·W⌋`, and likewise vertically). Truncating each component
/// independently means a round trip through [`absolute_to_normalized`]
/// stays within one pixel of the original.
pub fn normalized_to_absolute(
    region: &NormalizedRegion,
    frame_w: u32,
    frame_h: u32,
) -> PixelRegion {
    let w = f64::from(frame_w);
    let h = f64::from(frame_h);
    PixelRegion::new(
        (region.left * w) as i32,
        (region.top * h) as i32,
        (region.width * w) as i32,
        (region.height * h) as i32,
    )
}

/// Inverse of [`normalized_to_absolute`]. A zero-sized frame maps to an
/// empty region at the origin.
pub fn absolute_to_normalized(
    region: &PixelRegion,
    frame_w: u32,
    frame_h: u32,
) -> NormalizedRegion {
    if frame_w == 0 || frame_h == 0 {
        return NormalizedRegion::new(0.0, 0.0, 0.0, 0.0);
    }
    let w = f64::from(frame_w);
    let h = f64::from(frame_h);
    NormalizedRegion::new(
        f64::from(region.x) / w,
        f64::from(region.y) / h,
        f64::from(region.width) / w,
        f64::from(region.height) / h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // ── PixelRegion ──────────────────────────────────────────────────

    #[test]
    fn test_new_clamps_negative_size() {
        let r = PixelRegion::new(5, 5, -3, -1);
        assert_eq!(r.width, 0);
        assert_eq!(r.height, 0);
        assert!(r.is_empty());
    }

    #[rstest]
    #[case::even(PixelRegion::new(10, 20, 100, 50), Point::new(60, 45))]
    #[case::odd_truncates(PixelRegion::new(0, 0, 31, 45), Point::new(15, 22))]
    #[case::zero_sized(PixelRegion::new(7, 9, 0, 0), Point::new(7, 9))]
    fn test_center(#[case] region: PixelRegion, #[case] expected: Point) {
        assert_eq!(region.center(), expected);
    }

    #[test]
    fn test_offset_moves_origin_only() {
        let r = PixelRegion::new(3, 4, 10, 12).offset(100, 200);
        assert_eq!(r, PixelRegion::new(103, 204, 10, 12));
    }

    // ── Clipping ─────────────────────────────────────────────────────

    #[rstest]
    #[case::inside(PixelRegion::new(10, 10, 20, 20), Some(PixelRegion::new(10, 10, 20, 20)))]
    #[case::past_right_edge(PixelRegion::new(90, 10, 30, 20), Some(PixelRegion::new(90, 10, 10, 20)))]
    #[case::past_bottom_edge(PixelRegion::new(10, 70, 20, 20), Some(PixelRegion::new(10, 70, 20, 10)))]
    #[case::negative_origin(PixelRegion::new(-5, -5, 20, 20), Some(PixelRegion::new(0, 0, 15, 15)))]
    #[case::covers_frame(PixelRegion::new(-10, -10, 500, 500), Some(PixelRegion::new(0, 0, 100, 80)))]
    #[case::fully_outside(PixelRegion::new(150, 10, 20, 20), None)]
    #[case::touching_edge(PixelRegion::new(100, 10, 20, 20), None)]
    #[case::zero_width(PixelRegion::new(10, 10, 0, 20), None)]
    #[case::zero_height(PixelRegion::new(10, 10, 20, 0), None)]
    fn test_clip_to(#[case] region: PixelRegion, #[case] expected: Option<PixelRegion>) {
        assert_eq!(region.clip_to(100, 80), expected);
    }

    #[test]
    fn test_clip_to_zero_sized_frame() {
        assert_eq!(PixelRegion::new(0, 0, 10, 10).clip_to(0, 0), None);
    }

    #[test]
    fn test_clip_does_not_overflow_near_i32_max() {
        let r = PixelRegion::new(i32::MAX - 1, 0, i32::MAX, 10);
        assert_eq!(r.clip_to(100, 100), None);
    }

    // ── NormalizedRegion ─────────────────────────────────────────────

    #[test]
    fn test_normalized_new_keeps_valid_values() {
        let r = NormalizedRegion::new(0.25, 0.5, 0.5, 0.25);
        assert_relative_eq!(r.left, 0.25);
        assert_relative_eq!(r.top, 0.5);
        assert_relative_eq!(r.width, 0.5);
        assert_relative_eq!(r.height, 0.25);
    }

    #[test]
    fn test_normalized_new_clips_to_unit_square() {
        // Remote boxes can start left of the frame and end past its right edge
        let r = NormalizedRegion::new(-0.1, 0.8, 0.3, 0.5);
        assert_relative_eq!(r.left, 0.0);
        assert_relative_eq!(r.width, 0.2);
        assert_relative_eq!(r.top, 0.8);
        assert_relative_eq!(r.height, 0.2, epsilon = 1e-12);
        assert!(r.left + r.width <= 1.0);
        assert!(r.top + r.height <= 1.0 + 1e-12);
    }

    #[test]
    fn test_normalized_new_handles_nan_and_negative_size() {
        let r = NormalizedRegion::new(f64::NAN, 0.1, -0.5, 0.2);
        assert_relative_eq!(r.left, 0.0);
        assert!(r.is_empty());
    }

    // ── Coordinate mapping ───────────────────────────────────────────

    #[test]
    fn test_normalized_to_absolute_uses_frame_dimensions() {
        let n = NormalizedRegion::new(0.25, 0.5, 0.5, 0.25);
        let p = normalized_to_absolute(&n, 640, 480);
        assert_eq!(p, PixelRegion::new(160, 240, 320, 120));
    }

    #[test]
    fn test_normalized_to_absolute_truncates() {
        let n = NormalizedRegion::new(0.3333, 0.6667, 0.1, 0.1);
        let p = normalized_to_absolute(&n, 100, 100);
        assert_eq!(p, PixelRegion::new(33, 66, 10, 10));
    }

    #[test]
    fn test_absolute_to_normalized_zero_frame() {
        let n = absolute_to_normalized(&PixelRegion::new(1, 1, 1, 1), 0, 480);
        assert!(n.is_empty());
    }

    #[rstest]
    #[case(PixelRegion::new(0, 0, 30, 30), 640, 480)]
    #[case(PixelRegion::new(123, 77, 91, 64), 640, 480)]
    #[case(PixelRegion::new(29, 29, 29, 29), 100, 100)]
    #[case(PixelRegion::new(1919, 1079, 1, 1), 1920, 1080)]
    #[case(PixelRegion::new(333, 17, 250, 301), 1280, 720)]
    fn test_round_trip_within_one_pixel(
        #[case] original: PixelRegion,
        #[case] frame_w: u32,
        #[case] frame_h: u32,
    ) {
        let back = normalized_to_absolute(
            &absolute_to_normalized(&original, frame_w, frame_h),
            frame_w,
            frame_h,
        );
        assert!((back.x - original.x).abs() <= 1, "x drifted: {back:?}");
        assert!((back.y - original.y).abs() <= 1, "y drifted: {back:?}");
        assert!((back.width - original.width).abs() <= 1, "w drifted: {back:?}");
        assert!((back.height - original.height).abs() <= 1, "h drifted: {back:?}");
    }

    #[test]
    fn test_round_trip_exhaustive_small_frame() {
        for x in 0..37 {
            for w in 0..(37 - x) {
                let original = PixelRegion::new(x, x, w, w);
                let normalized = absolute_to_normalized(&original, 37, 37);
                let back = normalized_to_absolute(&normalized, 37, 37);
                assert!((back.x - original.x).abs() <= 1);
                assert!((back.width - original.width).abs() <= 1);
            }
        }
    }

    // ── Region ───────────────────────────────────────────────────────

    #[test]
    fn test_region_space_tag() {
        let p = Region::Pixel(PixelRegion::new(0, 0, 1, 1));
        let n = Region::Normalized(NormalizedRegion::new(0.0, 0.0, 0.5, 0.5));
        assert_eq!(p.space(), CoordinateSpace::Pixel);
        assert_eq!(n.space(), CoordinateSpace::Normalized);
    }

    #[test]
    fn test_region_to_pixels_pixel_is_identity() {
        let r = PixelRegion::new(-4, 3, 10, 10);
        assert_eq!(Region::Pixel(r).to_pixels(1, 1), r);
    }

    #[test]
    fn test_region_to_pixels_normalized_maps() {
        let region = Region::Normalized(NormalizedRegion::new(0.5, 0.5, 0.5, 0.5));
        assert_eq!(region.to_pixels(200, 100), PixelRegion::new(100, 50, 100, 50));
    }

    #[test]
    fn test_region_is_empty() {
        assert!(Region::Pixel(PixelRegion::new(0, 0, 0, 10)).is_empty());
        assert!(Region::Normalized(NormalizedRegion::new(0.2, 0.2, 0.0, 0.1)).is_empty());
        assert!(!Region::Pixel(PixelRegion::new(0, 0, 1, 1)).is_empty());
    }
}
