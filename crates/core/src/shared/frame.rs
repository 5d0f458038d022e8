use ndarray::{s, ArrayView3};

use crate::shared::region::PixelRegion;

/// A single video frame: contiguous pixel bytes in row-major order.
///
/// Color frames are RGB (3 channels); the luminance frame handed to the
/// cascade detectors has a single channel. Format conversion to and from
/// codec-specific layouts happens at I/O boundaries only.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Single-channel luminance copy of this frame.
    ///
    /// Uses the BT.601 weights in 14-bit fixed point, the same integer
    /// approximation OpenCV applies for RGB to GRAY, so detections match
    /// what the cascades were tuned on. Single-channel frames are cloned.
    pub fn to_luminance(&self) -> Frame {
        if self.channels == 1 {
            return self.clone();
        }

        let channels = self.channels as usize;
        let luma: Vec<u8> = self
            .data
            .chunks_exact(channels)
            .map(|px| {
                let r = px[0] as u32;
                let g = px[1] as u32;
                let b = px[2] as u32;
                ((r * 4899 + g * 9617 + b * 1868 + (1 << 13)) >> 14) as u8
            })
            .collect();

        Frame::new(luma, self.width, self.height, 1, self.index)
    }

    /// Copies out the part of `region` that lies inside the frame.
    ///
    /// Returns `None` when the clipped region is empty.
    pub fn crop(&self, region: &PixelRegion) -> Option<Frame> {
        let clipped = region.clip_to(self.width, self.height)?;
        let x = clipped.x as usize;
        let y = clipped.y as usize;
        let w = clipped.width as usize;
        let h = clipped.height as usize;

        let view = self.as_ndarray();
        let roi = view.slice(s![y..y + h, x..x + w, ..]);
        let data: Vec<u8> = roi.iter().copied().collect();

        Some(Frame::new(data, w as u32, h as u32, self.channels, self.index))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_data_mut_allows_modification() {
        let data = vec![0u8; 6]; // 2x1x3
        let mut frame = Frame::new(data, 2, 1, 3, 0);
        frame.data_mut()[0] = 255;
        assert_eq!(frame.data()[0], 255);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2x2 RGB: set pixel (row=1, col=0) to red
        let mut data = vec![0u8; 12];
        data[6] = 255;
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    // ── Luminance ────────────────────────────────────────────────────

    #[test]
    fn test_luminance_of_gray_pixels_is_identity() {
        let frame = Frame::new(vec![128u8; 4 * 3 * 3], 4, 3, 3, 7);
        let luma = frame.to_luminance();
        assert_eq!(luma.channels(), 1);
        assert_eq!(luma.width(), 4);
        assert_eq!(luma.height(), 3);
        assert_eq!(luma.index(), 7);
        assert!(luma.data().iter().all(|&v| v == 128));
    }

    #[test]
    fn test_luminance_weights_green_heaviest() {
        let frame = Frame::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255], 3, 1, 3, 0);
        let luma = frame.to_luminance();
        assert_eq!(luma.data(), &[76, 150, 29]);
    }

    #[test]
    fn test_luminance_of_white_saturates() {
        let frame = Frame::new(vec![255u8; 3], 1, 1, 3, 0);
        assert_eq!(frame.to_luminance().data(), &[255]);
    }

    #[test]
    fn test_luminance_of_single_channel_is_clone() {
        let frame = Frame::new(vec![1, 2, 3, 4], 2, 2, 1, 0);
        assert_eq!(frame.to_luminance().data(), frame.data());
    }

    // ── Cropping ─────────────────────────────────────────────────────

    fn numbered_gray(width: u32, height: u32) -> Frame {
        let data = (0..width * height).map(|v| v as u8).collect();
        Frame::new(data, width, height, 1, 0)
    }

    #[test]
    fn test_crop_inside_frame() {
        let frame = numbered_gray(4, 4);
        let crop = frame.crop(&PixelRegion::new(1, 1, 2, 2)).unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.data(), &[5, 6, 9, 10]);
    }

    #[test]
    fn test_crop_clipped_at_right_edge() {
        let frame = numbered_gray(4, 4);
        let crop = frame.crop(&PixelRegion::new(2, 0, 10, 2)).unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.data(), &[2, 3, 6, 7]);
    }

    #[test]
    fn test_crop_keeps_channels() {
        let frame = Frame::new(vec![9u8; 4 * 4 * 3], 4, 4, 3, 2);
        let crop = frame.crop(&PixelRegion::new(0, 0, 3, 1)).unwrap();
        assert_eq!(crop.channels(), 3);
        assert_eq!(crop.data().len(), 9);
        assert_eq!(crop.index(), 2);
    }

    #[test]
    fn test_crop_outside_frame_is_none() {
        let frame = numbered_gray(4, 4);
        assert!(frame.crop(&PixelRegion::new(10, 10, 5, 5)).is_none());
    }

    #[test]
    fn test_crop_zero_sized_is_none() {
        let frame = numbered_gray(4, 4);
        assert!(frame.crop(&PixelRegion::new(1, 1, 0, 3)).is_none());
    }
}
