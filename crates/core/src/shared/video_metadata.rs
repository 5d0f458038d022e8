#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container-reported frame count; 0 when the container doesn't say.
    pub total_frames: usize,
    pub codec: String,
}

impl VideoMetadata {
    /// Same geometry, re-timed to `fps`. The annotated output is written at a
    /// fixed rate regardless of the source rate.
    pub fn with_fps(&self, fps: f64) -> Self {
        Self {
            fps,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VideoMetadata {
        VideoMetadata {
            width: 1280,
            height: 720,
            fps: 29.97,
            total_frames: 300,
            codec: "h264".to_string(),
        }
    }

    #[test]
    fn test_with_fps_keeps_geometry() {
        let meta = sample();
        let retimed = meta.with_fps(10.0);
        assert_eq!(retimed.fps, 10.0);
        assert_eq!(retimed.width, meta.width);
        assert_eq!(retimed.height, meta.height);
        assert_eq!(retimed.total_frames, meta.total_frames);
        assert_eq!(retimed.codec, meta.codec);
        // original untouched
        assert_eq!(meta.fps, 29.97);
    }
}
