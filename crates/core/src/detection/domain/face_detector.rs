use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for anything that finds faces (or eyes) in a frame.
///
/// Local cascades and the remote classifier both implement it, so the
/// pipeline never knows which backend produced a [`Detection`].
/// Implementations may keep per-call state (retry counters, clients),
/// hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
