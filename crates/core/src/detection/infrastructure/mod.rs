pub mod cascade_detector;
pub mod cascade_resolver;
pub mod jpeg_encoder;
pub mod rekognition_detector;
pub mod retrying_detector;
