use std::path::{Path, PathBuf};

use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use thiserror::Error;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::region::PixelRegion;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("cascade model not found: {0}")]
    NotFound(PathBuf),
    #[error("cascade model path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),
    #[error("failed to load cascade model {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: opencv::Error,
    },
    #[error("cascade model {0} loaded empty (not a cascade XML?)")]
    Empty(PathBuf),
    #[error("invalid cascade parameters: {0}")]
    InvalidParams(String),
    #[error("cascade detection expects a single-channel frame, got {0} channels")]
    NotLuminance(u8),
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// Multi-scale sliding-window parameters.
///
/// - `scale_factor`: step between image-pyramid levels (must be > 1).
/// - `min_neighbors`: overlapping candidate windows needed to confirm a hit.
/// - `min_size`: candidates smaller than this `(w, h)` are discarded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
    pub min_size: (i32, i32),
}

impl CascadeParams {
    /// Frontal-face pass over the whole frame.
    pub const FACE: CascadeParams = CascadeParams {
        scale_factor: 1.1,
        min_neighbors: 5,
        min_size: (30, 30),
    };

    /// Eye pass inside a face: OpenCV's `detectMultiScale` defaults.
    pub const EYE: CascadeParams = CascadeParams {
        scale_factor: 1.1,
        min_neighbors: 3,
        min_size: (0, 0),
    };

    pub fn validate(&self) -> Result<(), CascadeError> {
        if self.scale_factor.is_nan() || self.scale_factor <= 1.0 {
            return Err(CascadeError::InvalidParams(format!(
                "scale factor must be greater than 1.0, got {}",
                self.scale_factor
            )));
        }
        if self.min_neighbors < 0 {
            return Err(CascadeError::InvalidParams(format!(
                "min neighbors must be non-negative, got {}",
                self.min_neighbors
            )));
        }
        if self.min_size.0 < 0 || self.min_size.1 < 0 {
            return Err(CascadeError::InvalidParams(format!(
                "min size must be non-negative, got {}x{}",
                self.min_size.0, self.min_size.1
            )));
        }
        Ok(())
    }
}

/// Haar/LBP cascade classifier backed by OpenCV's `objdetect`.
///
/// Expects luminance frames (see [`Frame::to_luminance`]) and returns
/// regions in absolute pixels relative to the frame it was given. Used for
/// both the frame-wide face pass and the per-face eye pass.
pub struct CascadeDetector {
    classifier: CascadeClassifier,
    params: CascadeParams,
}

impl CascadeDetector {
    pub fn load(path: &Path, params: CascadeParams) -> Result<Self, CascadeError> {
        params.validate()?;
        if !path.exists() {
            return Err(CascadeError::NotFound(path.to_path_buf()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| CascadeError::InvalidPath(path.to_path_buf()))?;

        let classifier = CascadeClassifier::new(path_str).map_err(|source| CascadeError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        // OpenCV happily "loads" files it cannot parse and reports it via empty()
        if classifier.empty()? {
            return Err(CascadeError::Empty(path.to_path_buf()));
        }

        log::debug!("Loaded cascade {} with {params:?}", path.display());
        Ok(Self { classifier, params })
    }

    pub fn detect_regions(&mut self, frame: &Frame) -> Result<Vec<PixelRegion>, CascadeError> {
        if frame.channels() != 1 {
            return Err(CascadeError::NotLuminance(frame.channels()));
        }
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let image = luminance_mat(frame)?;
        let mut found = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &image,
            &mut found,
            self.params.scale_factor,
            self.params.min_neighbors,
            0,
            Size::new(self.params.min_size.0, self.params.min_size.1),
            Size::new(0, 0),
        )?;

        Ok(found
            .iter()
            .map(|r| PixelRegion::new(r.x, r.y, r.width, r.height))
            .filter(|r| !r.is_empty())
            .collect())
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        Ok(self
            .detect_regions(frame)?
            .into_iter()
            .map(Detection::pixel)
            .collect())
    }
}

/// Copies a single-channel frame into an owned `CV_8UC1` matrix.
fn luminance_mat(frame: &Frame) -> Result<Mat, opencv::Error> {
    let flat = Mat::from_slice(frame.data())?;
    let shaped = flat.reshape(1, frame.height() as i32)?;
    shaped.try_clone()
}
