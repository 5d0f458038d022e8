use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("cannot encode an empty frame")]
    Empty,
    #[error("cannot encode a frame with {0} channels")]
    UnsupportedChannels(u8),
    #[error("JPEG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Encodes a frame as a baseline JPEG in memory.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, EncodeError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(EncodeError::Empty);
    }
    let color = match frame.channels() {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        n => return Err(EncodeError::UnsupportedChannels(n)),
    };

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode(frame.data(), frame.width(), frame.height(), color)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodes_rgb_frame_as_jpeg() {
        let frame = Frame::new(vec![90u8; 64 * 48 * 3], 64, 48, 3, 0);
        let bytes = encode_jpeg(&frame, 95).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encoded_jpeg_decodes_to_same_size() {
        let frame = Frame::new(vec![200u8; 40 * 30 * 3], 40, 30, 3, 0);
        let bytes = encode_jpeg(&frame, 90).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 30);
    }

    #[test]
    fn test_encodes_gray_frame() {
        let frame = Frame::new(vec![10u8; 16 * 16], 16, 16, 1, 0);
        assert!(encode_jpeg(&frame, 80).is_ok());
    }

    #[test]
    fn test_empty_frame_is_error() {
        let frame = Frame::new(Vec::new(), 0, 0, 3, 0);
        assert!(matches!(encode_jpeg(&frame, 95), Err(EncodeError::Empty)));
    }

    #[test]
    fn test_four_channels_rejected() {
        let frame = Frame::new(vec![0u8; 4 * 4 * 4], 4, 4, 4, 0);
        assert!(matches!(
            encode_jpeg(&frame, 95),
            Err(EncodeError::UnsupportedChannels(4))
        ));
    }
}
