use crate::shared::region::{NormalizedRegion, PixelRegion, Region};

/// One detected face or eye.
///
/// `confidence` is a percentage in `[0, 100]` and is only present for
/// detections coming from the remote classifier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub region: Region,
    pub confidence: Option<f64>,
}

impl Detection {
    pub fn pixel(region: PixelRegion) -> Self {
        Self {
            region: Region::Pixel(region),
            confidence: None,
        }
    }

    pub fn normalized(region: NormalizedRegion, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 100.0)
        };
        Self {
            region: Region::Normalized(region),
            confidence: Some(confidence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::region::CoordinateSpace;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_detection_has_no_confidence() {
        let d = Detection::pixel(PixelRegion::new(1, 2, 3, 4));
        assert_eq!(d.region.space(), CoordinateSpace::Pixel);
        assert!(d.confidence.is_none());
    }

    #[test]
    fn test_normalized_detection_keeps_confidence() {
        let d = Detection::normalized(NormalizedRegion::new(0.1, 0.1, 0.2, 0.2), 99.87);
        assert_eq!(d.region.space(), CoordinateSpace::Normalized);
        assert_relative_eq!(d.confidence.unwrap(), 99.87);
    }

    #[test]
    fn test_confidence_clamped_to_percentage() {
        let region = NormalizedRegion::new(0.1, 0.1, 0.2, 0.2);
        assert_relative_eq!(Detection::normalized(region, 140.0).confidence.unwrap(), 100.0);
        assert_relative_eq!(Detection::normalized(region, -3.0).confidence.unwrap(), 0.0);
        assert_relative_eq!(Detection::normalized(region, f64::NAN).confidence.unwrap(), 0.0);
    }
}
