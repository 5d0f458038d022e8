use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::shared::constants::DEFAULT_OUTPUT_FPS;

/// How often the remote classifier is consulted for a frame with faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RemoteInvocation {
    /// One full-frame call per locally detected face. A frame with three
    /// faces is classified three times and annotated three times over.
    #[default]
    PerLocalFace,
    /// One full-frame call for any frame with at least one local face.
    OncePerFrame,
}

/// What to do once a remote call has exhausted its retries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RemoteFailurePolicy {
    /// Log, count, drop the frame's remaining remote work, keep going.
    #[default]
    SkipFrame,
    /// End the run with the error. Output written so far is finalized.
    Abort,
}

/// Run-time knobs for an annotation run.
pub struct PipelineConfig {
    pub output_fps: f64,
    pub remote_invocation: RemoteInvocation,
    pub remote_failure_policy: RemoteFailurePolicy,
    /// Called after each written frame with `(current, total)`; returning
    /// `false` stops the run like the cancel flag does.
    pub on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    pub cancelled: Arc<AtomicBool>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_fps: DEFAULT_OUTPUT_FPS,
            remote_invocation: RemoteInvocation::default(),
            remote_failure_policy: RemoteFailurePolicy::default(),
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}
