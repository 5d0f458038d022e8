use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::annotation::domain::mark::Mark;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::LABEL_OFFSET_Y;
use crate::shared::frame::Frame;
use crate::shared::region::PixelRegion;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::pipeline_config::{PipelineConfig, RemoteFailurePolicy, RemoteInvocation};
use super::pipeline_logger::{stage, PipelineLogger};
use super::run_stats::RunStats;

/// Reads a video, marks faces and eyes on every frame, and writes the
/// annotated result.
///
/// Per frame: a local cascade finds faces on the luminance image; each face
/// gets a box and a center marker, then triggers a remote classification of
/// the full frame. Every remote face gets a box, a confidence label, and an
/// eye pass over its (clipped) area. Marks are drawn once per frame, after
/// all detectors have seen the undrawn pixels.
///
/// Single-use: `execute` consumes the owned components, so calling it twice
/// fails. The reader must already be open; `execute` opens the writer.
pub struct AnnotateVideoUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    stages: Option<Stages>,
    logger: Box<dyn PipelineLogger>,
    config: Option<PipelineConfig>,
}

struct Stages {
    face_detector: Box<dyn FaceDetector>,
    eye_detector: Box<dyn FaceDetector>,
    remote_detector: Box<dyn FaceDetector>,
    annotator: Box<dyn FrameAnnotator>,
}

impl AnnotateVideoUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        face_detector: Box<dyn FaceDetector>,
        eye_detector: Box<dyn FaceDetector>,
        remote_detector: Box<dyn FaceDetector>,
        annotator: Box<dyn FrameAnnotator>,
        logger: Box<dyn PipelineLogger>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            stages: Some(Stages {
                face_detector,
                eye_detector,
                remote_detector,
                annotator,
            }),
            logger,
            config: Some(config),
        }
    }

    pub fn execute(
        &mut self,
        metadata: &VideoMetadata,
        output_path: &Path,
    ) -> Result<RunStats, Box<dyn std::error::Error>> {
        let mut streams = OpenStreams {
            reader: self.reader.take().ok_or("Pipeline already executed")?,
            writer: self.writer.take().ok_or("Pipeline already executed")?,
            closed: false,
        };
        let mut stages = self.stages.take().ok_or("Pipeline already executed")?;
        let config = self.config.take().ok_or("Pipeline already executed")?;
        let logger = self.logger.as_mut();

        let output_meta = metadata.with_fps(config.output_fps);
        streams.writer.open(output_path, &output_meta)?;

        let total = metadata.total_frames;
        logger.info(&format!(
            "Annotating {}x{} video ({} frames reported) into {}",
            metadata.width,
            metadata.height,
            total,
            output_path.display()
        ));

        let mut stats = RunStats::default();

        for frame_result in streams.reader.frames() {
            if config.cancelled.load(Ordering::Relaxed) {
                stats.interrupted = true;
                break;
            }

            let mut frame = frame_result?;
            stats.total_frames += 1;

            stages.process(&mut frame, &config, logger, &mut stats)?;

            let t = Instant::now();
            streams.writer.write(&frame)?;
            logger.timing(stage::WRITE, elapsed_ms(t));

            logger.progress(stats.total_frames, total);
            if let Some(ref callback) = config.on_progress {
                if !callback(stats.total_frames, total) {
                    stats.interrupted = true;
                    break;
                }
            }
        }

        streams.close()?;
        logger.summary();
        Ok(stats)
    }
}

impl Stages {
    fn process(
        &mut self,
        frame: &mut Frame,
        config: &PipelineConfig,
        logger: &mut dyn PipelineLogger,
        stats: &mut RunStats,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (w, h) = (frame.width(), frame.height());

        let t = Instant::now();
        let luminance = frame.to_luminance();
        let faces: Vec<PixelRegion> = self
            .face_detector
            .detect(&luminance)?
            .iter()
            .map(|d| d.region.to_pixels(w, h))
            .filter(|r| !r.is_empty())
            .collect();
        let mut detect_ms = elapsed_ms(t);

        stats.faces_detected += faces.len();
        if !faces.is_empty() {
            stats.frames_with_face += 1;
        }
        logger.metric("faces", faces.len() as f64);

        let mut marks = Vec::new();
        let mut remote_ms = 0.0;
        let mut remote_ok = true;
        for (i, face) in faces.iter().enumerate() {
            marks.push(Mark::face_box(*face));
            marks.push(Mark::face_center(face));

            let run_remote = match config.remote_invocation {
                RemoteInvocation::PerLocalFace => true,
                RemoteInvocation::OncePerFrame => i + 1 == faces.len(),
            };
            if remote_ok && run_remote {
                remote_ok = self.remote_pass(
                    frame,
                    &luminance,
                    config.remote_failure_policy,
                    &mut marks,
                    stats,
                    &mut remote_ms,
                    &mut detect_ms,
                )?;
            }
        }
        logger.timing(stage::DETECT, detect_ms);
        if !faces.is_empty() {
            logger.timing(stage::REMOTE, remote_ms);
        }

        let t = Instant::now();
        self.annotator.annotate(frame, &marks)?;
        logger.timing(stage::ANNOTATE, elapsed_ms(t));
        Ok(())
    }

    /// One remote classification of the full frame plus the eye pass inside
    /// every face it returns. Returns `false` when the call failed and was
    /// skipped under [`RemoteFailurePolicy::SkipFrame`].
    #[allow(clippy::too_many_arguments)]
    fn remote_pass(
        &mut self,
        frame: &Frame,
        luminance: &Frame,
        policy: RemoteFailurePolicy,
        marks: &mut Vec<Mark>,
        stats: &mut RunStats,
        remote_ms: &mut f64,
        detect_ms: &mut f64,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        let (w, h) = (frame.width(), frame.height());

        stats.remote_calls += 1;
        let t = Instant::now();
        let result = self.remote_detector.detect(frame);
        *remote_ms += elapsed_ms(t);

        let detections = match result {
            Ok(d) => d,
            Err(e) => match policy {
                RemoteFailurePolicy::SkipFrame => {
                    log::warn!(
                        "Frame {}: remote classification failed, skipping remote annotations: {e}",
                        frame.index()
                    );
                    stats.remote_failures += 1;
                    return Ok(false);
                }
                RemoteFailurePolicy::Abort => {
                    return Err(
                        format!("frame {}: remote classification failed: {e}", frame.index())
                            .into(),
                    )
                }
            },
        };

        for detection in &detections {
            let face = detection.region.to_pixels(w, h);
            // sub-pixel boxes truncate to nothing; no box, no eyes, no label
            if face.is_empty() {
                continue;
            }
            marks.push(Mark::face_box(face));

            // eye pass only ever sees the part of the face inside the frame
            if let Some(area) = face.clip_to(w, h) {
                if let Some(roi) = luminance.crop(&area) {
                    let t = Instant::now();
                    let eyes = self.eye_detector.detect(&roi)?;
                    *detect_ms += elapsed_ms(t);

                    stats.eyes_detected += eyes.len();
                    marks.extend(eyes.iter().map(|eye| {
                        Mark::eye_box(
                            eye.region
                                .to_pixels(roi.width(), roi.height())
                                .offset(area.x, area.y),
                        )
                    }));
                }
            }

            if let Some(confidence) = detection.confidence {
                marks.push(Mark::confidence_label(&face, confidence, LABEL_OFFSET_Y));
            }
        }
        Ok(true)
    }
}

/// Reader and writer of a run. Closes both on every exit path; the explicit
/// [`close`](Self::close) surfaces a failed finalize, `Drop` only logs it.
struct OpenStreams {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    closed: bool,
}

impl OpenStreams {
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reader.close();
        self.writer.close()
    }
}

impl Drop for OpenStreams {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("Failed to finalize output video: {e}");
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
