use std::path::{Path, PathBuf};

use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;
use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("video reader is not open")]
    NotOpen,
    #[error("no video stream in {0}")]
    NoVideoStream(PathBuf),
    #[error("video stream {0} is gone")]
    StreamMissing(usize),
    #[error("failed to decode frame {frame}: {source}")]
    Decode {
        frame: usize,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("failed to convert frame {frame} to RGB: {source}")]
    Convert {
        frame: usize,
        #[source]
        source: ffmpeg_next::Error,
    },
}

/// Decodes the best video stream of a file into RGB24 frames.
///
/// Frames come out in decode order, numbered from 0. Any decoder or
/// conversion failure is yielded once as an error and ends the stream.
pub struct FfmpegReader {
    input: Option<Input>,
    stream_index: usize,
}

// Safety: the reader is moved between threads but never shared; the ffmpeg
// contexts it owns are only touched through `&mut self`.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input: None,
            stream_index: 0,
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let input = ffmpeg_next::format::input(path)?;
        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| ReadError::NoVideoStream(path.to_path_buf()))?;
        let decoder = open_decoder(&stream)?;

        let rate = stream.rate();
        let fps = if rate.denominator() == 0 {
            0.0
        } else {
            f64::from(rate.numerator()) / f64::from(rate.denominator())
        };
        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames: usize::try_from(stream.frames()).unwrap_or(0),
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
        };

        self.stream_index = stream.index();
        self.input = Some(input);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let stream_index = self.stream_index;
        let Some(input) = self.input.as_mut() else {
            return Box::new(std::iter::once(Err(ReadError::NotOpen.into())));
        };

        match DecodedFrames::new(input, stream_index) {
            Ok(frames) => Box::new(frames),
            Err(e) => Box::new(std::iter::once(Err(e.into()))),
        }
    }

    fn close(&mut self) {
        self.input = None;
    }
}

fn open_decoder(
    stream: &ffmpeg_next::format::stream::Stream,
) -> Result<ffmpeg_next::decoder::Video, ffmpeg_next::Error> {
    ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
        .decoder()
        .video()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Reading,
    Draining,
    Finished,
}

/// What one `receive_frame` call produced.
#[derive(Debug, PartialEq, Eq)]
enum Receive {
    Frame,
    NeedInput,
    Drained,
}

fn classify_receive(result: Result<(), ffmpeg_next::Error>) -> Result<Receive, ffmpeg_next::Error> {
    match result {
        Ok(()) => Ok(Receive::Frame),
        Err(ffmpeg_next::Error::Eof) => Ok(Receive::Drained),
        Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::util::error::EAGAIN => {
            Ok(Receive::NeedInput)
        }
        Err(e) => Err(e),
    }
}

/// Pulls packets on demand, so only one decoded frame is held at a time.
struct DecodedFrames<'a> {
    input: &'a mut Input,
    stream_index: usize,
    decoder: ffmpeg_next::decoder::Video,
    converter: scaling::Context,
    width: u32,
    height: u32,
    next_index: usize,
    state: State,
}

impl<'a> DecodedFrames<'a> {
    fn new(input: &'a mut Input, stream_index: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let decoder = {
            let stream = input
                .stream(stream_index)
                .ok_or(ReadError::StreamMissing(stream_index))?;
            open_decoder(&stream)?
        };
        let (width, height) = (decoder.width(), decoder.height());
        let converter = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            input,
            stream_index,
            decoder,
            converter,
            width,
            height,
            next_index: 0,
            state: State::Reading,
        })
    }

    /// Sends the next packet of our stream, or end-of-stream once the
    /// container runs dry.
    fn feed(&mut self) -> Result<(), ffmpeg_next::Error> {
        let index = self.stream_index;
        let next = self.input.packets().find(|(stream, _)| stream.index() == index);
        match next {
            Some((_, packet)) => self.decoder.send_packet(&packet),
            None => {
                self.state = State::Draining;
                self.decoder.send_eof()
            }
        }
    }

    fn convert(&mut self, decoded: &Video) -> Result<Frame, Box<dyn std::error::Error>> {
        let mut rgb = Video::empty();
        if let Err(source) = self.converter.run(decoded, &mut rgb) {
            self.state = State::Finished;
            return Err(Box::new(ReadError::Convert {
                frame: self.next_index,
                source,
            }));
        }
        let frame = Frame::new(
            packed_rgb(&rgb, self.width, self.height),
            self.width,
            self.height,
            3,
            self.next_index,
        );
        self.next_index += 1;
        Ok(frame)
    }

    /// Reports a decoder failure and ends the stream.
    fn fail(&mut self, source: ffmpeg_next::Error) -> Result<Frame, Box<dyn std::error::Error>> {
        self.state = State::Finished;
        Err(Box::new(ReadError::Decode {
            frame: self.next_index,
            source,
        }))
    }
}

impl Iterator for DecodedFrames<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.state == State::Finished {
                return None;
            }

            let mut decoded = Video::empty();
            match classify_receive(self.decoder.receive_frame(&mut decoded)) {
                Ok(Receive::Frame) => return Some(self.convert(&decoded)),
                Ok(Receive::NeedInput) if self.state == State::Reading => {}
                Ok(Receive::NeedInput) | Ok(Receive::Drained) => {
                    self.state = State::Finished;
                    return None;
                }
                Err(e) => return Some(self.fail(e)),
            }

            if let Err(e) = self.feed() {
                return Some(self.fail(e));
            }
        }
    }
}

/// Row-by-row copy that drops the stride padding ffmpeg may add.
fn packed_rgb(rgb: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let row_bytes = width as usize * 3;
    rgb.data(0)
        .chunks(stride)
        .take(height as usize)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_writer::VideoWriter;
    use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;

    /// Writes `count` flat gray frames, frame `i` at brightness `i * 40`.
    fn write_gray_video(path: &Path, count: usize, width: u32, height: u32) {
        let metadata = VideoMetadata {
            width,
            height,
            fps: 30.0,
            total_frames: count,
            codec: String::new(),
        };
        let mut writer = FfmpegWriter::new();
        writer.open(path, &metadata).unwrap();
        for i in 0..count {
            let value = ((i * 40) % 256) as u8;
            let data = vec![value; (width * height * 3) as usize];
            writer.write(&Frame::new(data, width, height, 3, i)).unwrap();
        }
        writer.close().unwrap();
    }

    fn sample_video(dir: &tempfile::TempDir, count: usize) -> PathBuf {
        let path = dir.path().join("sample.avi");
        write_gray_video(&path, count, 160, 120);
        path
    }

    fn mean(frame: &Frame) -> f64 {
        frame.data().iter().map(|&v| f64::from(v)).sum::<f64>() / frame.data().len() as f64
    }

    #[test]
    fn test_open_reports_geometry_rate_and_codec() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_video(&dir, 4);

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path).unwrap();
        assert_eq!((meta.width, meta.height), (160, 120));
        assert!((meta.fps - 30.0).abs() < 0.01, "fps was {}", meta.fps);
        assert_eq!(meta.codec, "mjpeg");
    }

    #[test]
    fn test_open_missing_file_fails() {
        let mut reader = FfmpegReader::new();
        assert!(reader.open(Path::new("/nonexistent/man.mp4")).is_err());
    }

    #[test]
    fn test_yields_every_frame_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_video(&dir, 5);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();

        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
    }

    #[test]
    fn test_frames_keep_their_brightness() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_video(&dir, 3);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();

        assert!(mean(&frames[0]) < 20.0);
        assert!((mean(&frames[2]) - 80.0).abs() < 20.0);
    }

    #[test]
    fn test_decoder_failure_is_reported_once_then_stream_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_video(&dir, 3);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        let stream_index = reader.stream_index;
        let input = reader.input.as_mut().unwrap();
        let mut frames = DecodedFrames::new(input, stream_index).unwrap();

        assert_eq!(frames.next().unwrap().unwrap().index(), 0);
        let err = frames.fail(ffmpeg_next::Error::InvalidData).unwrap_err();
        assert!(err.to_string().contains("failed to decode frame 1"), "{err}");
        assert!(frames.next().is_none());
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_receive_outcomes() {
        let again = ffmpeg_next::Error::Other {
            errno: ffmpeg_next::util::error::EAGAIN,
        };
        assert_eq!(classify_receive(Ok(())), Ok(Receive::Frame));
        assert_eq!(classify_receive(Err(again)), Ok(Receive::NeedInput));
        assert_eq!(
            classify_receive(Err(ffmpeg_next::Error::Eof)),
            Ok(Receive::Drained)
        );
        assert_eq!(
            classify_receive(Err(ffmpeg_next::Error::InvalidData)),
            Err(ffmpeg_next::Error::InvalidData)
        );
    }

    #[test]
    fn test_frames_before_open_is_error() {
        let mut reader = FfmpegReader::new();
        let first = reader.frames().next().unwrap();
        assert!(first.unwrap_err().to_string().contains("not open"));
    }

    #[test]
    fn test_frames_after_close_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_video(&dir, 2);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        reader.close();
        reader.close();
        assert!(reader.frames().next().unwrap().is_err());
    }
}
