use opencv::core::{Mat, Point as CvPoint, Rect, Scalar};
use opencv::imgproc;
use opencv::prelude::*;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::annotation::domain::mark::{Color, Mark};
use crate::shared::constants::{LABEL_FONT_SCALE, LABEL_THICKNESS, MARKER_RADIUS, RECT_THICKNESS};
use crate::shared::frame::Frame;

/// Draws marks with OpenCV's `imgproc` primitives.
///
/// The frame is copied into an owned matrix, drawn on, and copied back, so
/// OpenCV's clipping applies to anything that extends past an edge.
pub struct OpenCvAnnotator {
    rect_thickness: i32,
    marker_radius: i32,
    font_scale: f64,
    label_thickness: i32,
}

impl OpenCvAnnotator {
    pub fn new(rect_thickness: i32, marker_radius: i32, font_scale: f64, label_thickness: i32) -> Self {
        Self {
            rect_thickness,
            marker_radius,
            font_scale,
            label_thickness,
        }
    }

    fn draw(&self, image: &mut Mat, mark: &Mark) -> opencv::Result<()> {
        match mark {
            Mark::Rectangle { region, color } => {
                if region.is_empty() {
                    return Ok(());
                }
                imgproc::rectangle(
                    image,
                    Rect::new(region.x, region.y, region.width, region.height),
                    scalar(*color),
                    self.rect_thickness,
                    imgproc::LINE_8,
                    0,
                )
            }
            Mark::Marker { center, color } => imgproc::circle(
                image,
                CvPoint::new(center.x, center.y),
                self.marker_radius,
                scalar(*color),
                -1, // filled
                imgproc::LINE_8,
                0,
            ),
            Mark::Label {
                text,
                origin,
                color,
            } => imgproc::put_text(
                image,
                text,
                CvPoint::new(origin.x, origin.y),
                imgproc::FONT_HERSHEY_SIMPLEX,
                self.font_scale,
                scalar(*color),
                self.label_thickness,
                imgproc::LINE_8,
                false,
            ),
        }
    }
}

impl Default for OpenCvAnnotator {
    fn default() -> Self {
        Self::new(RECT_THICKNESS, MARKER_RADIUS, LABEL_FONT_SCALE, LABEL_THICKNESS)
    }
}

impl FrameAnnotator for OpenCvAnnotator {
    fn annotate(
        &self,
        frame: &mut Frame,
        marks: &[Mark],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if marks.is_empty() || frame.width() == 0 || frame.height() == 0 {
            return Ok(());
        }

        let mut image = frame_mat(frame)?;
        for mark in marks {
            self.draw(&mut image, mark)?;
        }
        frame.data_mut().copy_from_slice(image.data_bytes()?);
        Ok(())
    }
}

fn frame_mat(frame: &Frame) -> opencv::Result<Mat> {
    let flat = Mat::from_slice(frame.data())?;
    let shaped = flat.reshape(i32::from(frame.channels()), frame.height() as i32)?;
    shaped.try_clone()
}

/// Frame data is RGB, so the scalar follows the same channel order.
fn scalar(color: Color) -> Scalar {
    Scalar::new(
        f64::from(color.r),
        f64::from(color.g),
        f64::from(color.b),
        0.0,
    )
}
