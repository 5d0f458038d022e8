/// Counters accumulated over one annotation run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStats {
    /// Frames pulled from the source, including one interrupted mid-way.
    pub total_frames: usize,
    /// Frames with at least one local face, counted once per frame.
    pub frames_with_face: usize,
    /// Local face detections over all frames.
    pub faces_detected: usize,
    pub eyes_detected: usize,
    pub remote_calls: usize,
    /// Remote sub-steps skipped after the retry budget ran out.
    pub remote_failures: usize,
    /// Set when the run was stopped by the user before the source ended.
    pub interrupted: bool,
}

impl RunStats {
    /// Share of frames with a face, in percent. An empty run reports 0.
    pub fn detection_percentage(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.frames_with_face as f64 / self.total_frames as f64 * 100.0
    }
}
