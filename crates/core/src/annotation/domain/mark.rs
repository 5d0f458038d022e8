use crate::shared::region::{PixelRegion, Point};

/// RGB color, channel order matching [`Frame`](crate::shared::frame::Frame) data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Faces: rectangle, center marker and confidence label.
    pub const FACE: Color = Color::rgb(0, 0, 255);
    /// Eyes: rectangle only.
    pub const EYE: Color = Color::rgb(255, 0, 0);
}

/// One drawing instruction, always in absolute pixels of the frame it is
/// applied to.
#[derive(Clone, Debug, PartialEq)]
pub enum Mark {
    /// Outlined rectangle.
    Rectangle { region: PixelRegion, color: Color },
    /// Small filled circle.
    Marker { center: Point, color: Color },
    /// Text with its baseline starting at `origin`.
    Label {
        text: String,
        origin: Point,
        color: Color,
    },
}

impl Mark {
    pub fn face_box(region: PixelRegion) -> Self {
        Mark::Rectangle {
            region,
            color: Color::FACE,
        }
    }

    pub fn eye_box(region: PixelRegion) -> Self {
        Mark::Rectangle {
            region,
            color: Color::EYE,
        }
    }

    pub fn face_center(region: &PixelRegion) -> Self {
        Mark::Marker {
            center: region.center(),
            color: Color::FACE,
        }
    }

    /// `"Confidence: 99.12%"` placed `offset_y` pixels above the box.
    pub fn confidence_label(region: &PixelRegion, confidence: f64, offset_y: i32) -> Self {
        Mark::Label {
            text: format!("Confidence: {confidence:.2}%"),
            origin: Point::new(region.x, region.y - offset_y),
            color: Color::FACE,
        }
    }
}
