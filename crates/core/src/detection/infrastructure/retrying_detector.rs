use std::time::Duration;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::remote_error::RemoteDetectError;
use crate::shared::frame::Frame;

type SleepFn = Box<dyn Fn(Duration) + Send>;

/// Decorator that retries transient remote failures with exponential backoff.
///
/// Only errors that downcast to a retryable [`RemoteDetectError`] are
/// retried; anything else is returned on the first attempt. After
/// `max_retries` further attempts the last error is returned as-is.
pub struct RetryingDetector {
    inner: Box<dyn FaceDetector>,
    max_retries: u32,
    base_backoff: Duration,
    sleep: SleepFn,
}

impl RetryingDetector {
    pub fn new(inner: Box<dyn FaceDetector>, max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_backoff,
            sleep: Box::new(std::thread::sleep),
        }
    }

    #[cfg(test)]
    fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = sleep;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

fn is_retryable(err: &(dyn std::error::Error + 'static)) -> bool {
    err.downcast_ref::<RemoteDetectError>()
        .is_some_and(RemoteDetectError::is_retryable)
}

impl FaceDetector for RetryingDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let mut attempt = 0;
        loop {
            match self.inner.detect(frame) {
                Ok(detections) => return Ok(detections),
                Err(e) if attempt < self.max_retries && is_retryable(e.as_ref()) => {
                    let delay = self.backoff(attempt);
                    log::warn!(
                        "Frame {}: remote classification failed ({e}), retrying in {delay:?}",
                        frame.index()
                    );
                    (self.sleep)(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
