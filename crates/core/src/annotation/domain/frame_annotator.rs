use crate::annotation::domain::mark::Mark;
use crate::shared::frame::Frame;

/// Domain interface for drawing marks onto a frame.
///
/// Implementations modify the frame in-place. Marks that fall partly or
/// wholly outside the frame are clipped, never rejected.
pub trait FrameAnnotator: Send {
    fn annotate(&self, frame: &mut Frame, marks: &[Mark])
        -> Result<(), Box<dyn std::error::Error>>;
}
