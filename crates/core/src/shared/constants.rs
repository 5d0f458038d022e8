pub const FACE_CASCADE_NAME: &str = "haarcascade_frontalface_default.xml";
pub const FACE_CASCADE_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_frontalface_default.xml";

pub const EYE_CASCADE_NAME: &str = "haarcascade_eye.xml";
pub const EYE_CASCADE_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_eye.xml";

/// Output frame rate of the annotated video.
pub const DEFAULT_OUTPUT_FPS: f64 = 10.0;
pub const DEFAULT_OUTPUT_PATH: &str = "output_video.avi";

pub const DEFAULT_AWS_REGION: &str = "us-east-1";
/// Upper bound for one remote classification round-trip.
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_REMOTE_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;

/// JPEG quality for frames sent to the remote classifier.
pub const REMOTE_JPEG_QUALITY: u8 = 95;

pub const RECT_THICKNESS: i32 = 2;
pub const MARKER_RADIUS: i32 = 4;
pub const LABEL_FONT_SCALE: f64 = 0.5;
pub const LABEL_THICKNESS: i32 = 2;
/// Vertical gap between a label's baseline and the top of its rectangle.
pub const LABEL_OFFSET_Y: i32 = 10;
