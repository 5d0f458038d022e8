//! Face and eye annotation of videos.
//!
//! Bounded contexts, each split into `domain` (ports and pure logic) and
//! `infrastructure` (adapters over OpenCV, ffmpeg and AWS Rekognition):
//!
//! - [`detection`]: local cascades and the remote classifier behind one
//!   [`FaceDetector`](detection::domain::face_detector::FaceDetector) port
//! - [`annotation`]: drawing marks onto frames
//! - [`video`]: decoding the source and encoding the Motion-JPEG output
//! - [`pipeline`]: the per-frame driver, run statistics and reporting

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod region;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod face_detector;
        pub mod remote_error;
    }
    pub mod infrastructure;
}

pub mod annotation {
    pub mod domain {
        pub mod frame_annotator;
        pub mod mark;
    }
    pub mod infrastructure {
        pub mod opencv_annotator;
    }
}

pub mod video {
    pub mod domain {
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure {
        pub mod ffmpeg_reader;
        pub mod ffmpeg_writer;
    }
}

pub mod pipeline {
    pub mod annotate_video_use_case;
    pub mod pipeline_config;
    pub mod pipeline_logger;
    pub mod run_stats;
    pub mod stats_reporter;
}
