use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::config::Region as AwsRegion;
use aws_sdk_rekognition::error::{DisplayErrorContext, SdkError};
use aws_sdk_rekognition::operation::detect_faces::DetectFacesError;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{Attribute, FaceDetail, Image};
use aws_sdk_rekognition::Client;
use tokio::runtime::Runtime;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::remote_error::RemoteDetectError;
use crate::detection::infrastructure::jpeg_encoder::encode_jpeg;
use crate::shared::constants::{DEFAULT_AWS_REGION, DEFAULT_REMOTE_TIMEOUT_MS, REMOTE_JPEG_QUALITY};
use crate::shared::frame::Frame;
use crate::shared::region::NormalizedRegion;

#[derive(Clone, Debug, PartialEq)]
pub struct RekognitionConfig {
    pub region: String,
    /// Upper bound for a single DetectFaces call, connect through response.
    pub timeout: Duration,
    pub jpeg_quality: u8,
}

impl Default for RekognitionConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_AWS_REGION.to_string(),
            timeout: Duration::from_millis(DEFAULT_REMOTE_TIMEOUT_MS),
            jpeg_quality: REMOTE_JPEG_QUALITY,
        }
    }
}

/// Remote face classifier backed by AWS Rekognition `DetectFaces`.
///
/// Each call JPEG-encodes the whole frame and returns one normalized
/// detection per face, with the service's confidence. Credentials come from
/// the default AWS provider chain. The SDK's own retries are turned off;
/// wrap in [`RetryingDetector`](super::retrying_detector::RetryingDetector)
/// to get a bounded, logged retry policy instead.
pub struct RekognitionDetector {
    client: Client,
    runtime: Runtime,
    config: RekognitionConfig,
}

impl RekognitionDetector {
    pub fn connect(config: RekognitionConfig) -> Result<Self, RemoteDetectError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RemoteDetectError::Runtime)?;

        let sdk_config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(AwsRegion::new(config.region.clone()))
                .timeout_config(
                    TimeoutConfig::builder()
                        .operation_timeout(config.timeout)
                        .build(),
                )
                .retry_config(RetryConfig::disabled())
                .load(),
        );
        log::info!(
            "Remote classifier: Rekognition in {} (timeout {:?})",
            config.region,
            config.timeout
        );

        Ok(Self {
            client: Client::new(&sdk_config),
            runtime,
            config,
        })
    }

    pub fn detect_faces(&self, frame: &Frame) -> Result<Vec<Detection>, RemoteDetectError> {
        let bytes = encode_jpeg(frame, self.config.jpeg_quality)
            .map_err(|e| RemoteDetectError::Encode(e.to_string()))?;
        let image = Image::builder().bytes(Blob::new(bytes)).build();

        let request = self
            .client
            .detect_faces()
            .image(image)
            .attributes(Attribute::All)
            .send();
        let output = self
            .runtime
            .block_on(request)
            .map_err(|e| classify_sdk_error(e, self.config.timeout))?;

        detections_from_face_details(output.face_details())
    }
}

impl FaceDetector for RekognitionDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        Ok(self.detect_faces(frame)?)
    }
}

fn classify_sdk_error<R>(
    err: SdkError<DetectFacesError, R>,
    timeout: Duration,
) -> RemoteDetectError
where
    R: std::fmt::Debug,
{
    match err {
        SdkError::TimeoutError(_) => RemoteDetectError::Timeout(timeout),
        SdkError::DispatchFailure(ref failure) if failure.is_timeout() => {
            RemoteDetectError::Timeout(timeout)
        }
        SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            RemoteDetectError::Unavailable(DisplayErrorContext(&err).to_string())
        }
        SdkError::ServiceError(ctx) => classify_service_error(ctx.err()),
        SdkError::ConstructionFailure(_) => {
            RemoteDetectError::Rejected(DisplayErrorContext(&err).to_string())
        }
        _ => RemoteDetectError::Unavailable(DisplayErrorContext(&err).to_string()),
    }
}

fn classify_service_error(err: &DetectFacesError) -> RemoteDetectError {
    let message = DisplayErrorContext(err).to_string();
    if err.is_throttling_exception() || err.is_provisioned_throughput_exceeded_exception() {
        RemoteDetectError::Throttled(message)
    } else if err.is_internal_server_error() {
        RemoteDetectError::Unavailable(message)
    } else {
        RemoteDetectError::Rejected(message)
    }
}

/// Converts `DetectFaces` face details into normalized detections.
///
/// A face without a complete bounding box or a confidence makes the whole
/// response malformed; partial geometry is never guessed at.
pub fn detections_from_face_details(
    details: &[FaceDetail],
) -> Result<Vec<Detection>, RemoteDetectError> {
    details
        .iter()
        .enumerate()
        .map(|(i, face)| {
            let bbox = face.bounding_box().ok_or_else(|| {
                RemoteDetectError::MalformedResponse(format!("face {i} has no bounding box"))
            })?;
            let field = |name: &str, value: Option<f32>| {
                value.map(f64::from).ok_or_else(|| {
                    RemoteDetectError::MalformedResponse(format!(
                        "face {i} bounding box is missing {name}"
                    ))
                })
            };
            let region = NormalizedRegion::new(
                field("left", bbox.left())?,
                field("top", bbox.top())?,
                field("width", bbox.width())?,
                field("height", bbox.height())?,
            );
            let confidence = face.confidence().map(f64::from).ok_or_else(|| {
                RemoteDetectError::MalformedResponse(format!("face {i} has no confidence"))
            })?;
            Ok(Detection::normalized(region, confidence))
        })
        .collect()
}
