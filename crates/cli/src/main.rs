use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use face_annotate_core::annotation::infrastructure::opencv_annotator::OpenCvAnnotator;
use face_annotate_core::detection::domain::face_detector::FaceDetector;
use face_annotate_core::detection::infrastructure::cascade_detector::{
    CascadeDetector, CascadeParams,
};
use face_annotate_core::detection::infrastructure::cascade_resolver;
use face_annotate_core::detection::infrastructure::rekognition_detector::{
    RekognitionConfig, RekognitionDetector,
};
use face_annotate_core::detection::infrastructure::retrying_detector::RetryingDetector;
use face_annotate_core::pipeline::annotate_video_use_case::AnnotateVideoUseCase;
use face_annotate_core::pipeline::pipeline_config::{
    PipelineConfig, RemoteFailurePolicy, RemoteInvocation,
};
use face_annotate_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use face_annotate_core::pipeline::stats_reporter;
use face_annotate_core::shared::constants::{
    DEFAULT_AWS_REGION, DEFAULT_OUTPUT_PATH, DEFAULT_RETRY_BACKOFF_MS, EYE_CASCADE_NAME,
    EYE_CASCADE_URL, FACE_CASCADE_NAME, FACE_CASCADE_URL, REMOTE_JPEG_QUALITY,
};
use face_annotate_core::video::domain::video_reader::VideoReader;
use face_annotate_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use face_annotate_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Marks faces and eyes on every frame of a video.
///
/// Faces found by a local Haar cascade are boxed and classified remotely by
/// AWS Rekognition; remote faces get a confidence label and an eye pass.
/// Press 'q' or Ctrl-C to stop early; the output stays playable.
#[derive(Parser)]
#[command(name = "face-annotate")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Output video; the container follows the extension.
    #[arg(long, short, default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Output frame rate.
    #[arg(long, default_value = "10")]
    fps: f64,

    /// Directory holding the Haar cascade XML files (downloaded if absent).
    #[arg(long)]
    cascade_dir: Option<PathBuf>,

    /// Image-pyramid step of the face cascade (> 1.0).
    #[arg(long, default_value = "1.1")]
    scale_factor: f64,

    /// Overlapping candidate windows needed to confirm a face.
    #[arg(long, default_value = "5")]
    min_neighbors: i32,

    /// Smallest face, in pixels per side.
    #[arg(long, default_value = "30")]
    min_size: i32,

    /// AWS region of the Rekognition endpoint.
    #[arg(long, default_value = DEFAULT_AWS_REGION)]
    region: String,

    /// Timeout of one remote classification call, in milliseconds.
    #[arg(long, default_value = "10000")]
    remote_timeout_ms: u64,

    /// Extra attempts for a remote call that timed out or was throttled.
    #[arg(long, default_value = "2")]
    retries: u32,

    /// What to do when a remote call keeps failing: skip or abort.
    #[arg(long, default_value = "skip")]
    on_remote_error: String,

    /// Classify each frame remotely once, not once per local face.
    #[arg(long)]
    remote_once_per_frame: bool,

    /// Don't watch the keyboard for 'q' (Ctrl-C still stops the run).
    #[arg(long)]
    no_keyboard: bool,
}

fn main() {
    init_logging();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// `RUST_LOG` wins; `info` otherwise. Lines end in `\r\n` so they stay
/// aligned while the keyboard watcher holds the terminal in raw mode.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5} {}] {}\r",
                buf.timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let face_params = CascadeParams {
        scale_factor: cli.scale_factor,
        min_neighbors: cli.min_neighbors,
        min_size: (cli.min_size, cli.min_size),
    };
    let face_detector = load_cascade(
        FACE_CASCADE_NAME,
        FACE_CASCADE_URL,
        cli.cascade_dir.as_deref(),
        face_params,
    )?;
    let eye_detector = load_cascade(
        EYE_CASCADE_NAME,
        EYE_CASCADE_URL,
        cli.cascade_dir.as_deref(),
        CascadeParams::EYE,
    )?;
    let remote_detector = build_remote_detector(&cli)?;

    let mut reader: Box<dyn VideoReader> = Box::new(FfmpegReader::new());
    let metadata = reader.open(&cli.input)?;
    log::info!(
        "Opened {} ({}x{}, {:.2} fps, {})",
        cli.input.display(),
        metadata.width,
        metadata.height,
        metadata.fps,
        metadata.codec
    );

    let cancelled = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(cancelled.clone());
    let keyboard = if !cli.no_keyboard && io::stdin().is_terminal() {
        match KeyboardWatch::start(cancelled.clone()) {
            Ok(watch) => Some(watch),
            Err(e) => {
                log::warn!("Keyboard abort unavailable: {e}");
                None
            }
        }
    } else {
        None
    };

    let config = PipelineConfig {
        output_fps: cli.fps,
        remote_invocation: parse_remote_invocation(cli.remote_once_per_frame),
        remote_failure_policy: parse_failure_policy(&cli.on_remote_error),
        on_progress: None,
        cancelled,
    };

    let mut use_case = AnnotateVideoUseCase::new(
        reader,
        Box::new(FfmpegWriter::new()),
        face_detector,
        eye_detector,
        remote_detector,
        Box::new(OpenCvAnnotator::default()),
        Box::new(StdoutPipelineLogger::default()),
        config,
    );

    if keyboard.is_some() {
        log::info!("Press 'q' to stop early");
    }
    let result = use_case.execute(&metadata, &cli.output);
    drop(keyboard);

    let stats = result?;
    stats_reporter::report(&mut io::stdout().lock(), &stats, &cli.output)?;
    Ok(())
}

fn load_cascade(
    name: &str,
    url: &str,
    search_dir: Option<&Path>,
    params: CascadeParams,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving cascade: {name}");
    let path = cascade_resolver::resolve(name, url, search_dir, Some(Box::new(download_progress)))?;
    Ok(Box::new(CascadeDetector::load(&path, params)?))
}

fn build_remote_detector(cli: &Cli) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let remote = RekognitionDetector::connect(RekognitionConfig {
        region: cli.region.clone(),
        timeout: Duration::from_millis(cli.remote_timeout_ms),
        jpeg_quality: REMOTE_JPEG_QUALITY,
    })?;
    Ok(Box::new(RetryingDetector::new(
        Box::new(remote),
        cli.retries,
        Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
    )))
}

/// First Ctrl-C stops after the current frame; a second one exits at once.
fn install_interrupt_handler(cancelled: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        if cancelled.swap(true, Ordering::SeqCst) {
            process::exit(130);
        }
        log::warn!("Interrupted, finishing the current frame (Ctrl-C again to quit now)");
    }) {
        log::warn!("Failed to install Ctrl-C handler: {e}");
    }
}

/// Watches for 'q' on a background thread while the terminal is in raw mode.
///
/// Raw mode swallows the Ctrl-C signal, so Ctrl-C is handled here as a key
/// too. Dropping the watch stops the thread and restores the terminal.
struct KeyboardWatch {
    done: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl KeyboardWatch {
    fn start(cancelled: Arc<AtomicBool>) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let done = Arc::new(AtomicBool::new(false));
        let thread_done = done.clone();
        let handle = thread::spawn(move || watch_keys(&cancelled, &thread_done));
        Ok(Self {
            done,
            handle: Some(handle),
        })
    }
}

impl Drop for KeyboardWatch {
    fn drop(&mut self) {
        self.done.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("Failed to restore terminal: {e}");
        }
    }
}

fn watch_keys(cancelled: &AtomicBool, done: &AtomicBool) {
    while !done.load(Ordering::SeqCst) && !cancelled.load(Ordering::SeqCst) {
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if is_abort_key(&key) => {
                    cancelled.store(true, Ordering::SeqCst);
                    log::warn!("Stopping after the current frame");
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Keyboard watch stopped: {e}");
                    return;
                }
            },
            Ok(false) => {}
            Err(e) => {
                log::warn!("Keyboard watch stopped: {e}");
                return;
            }
        }
    }
}

fn is_abort_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !cli.fps.is_finite() || cli.fps <= 0.0 {
        return Err(format!("Frame rate must be positive, got {}", cli.fps).into());
    }
    CascadeParams {
        scale_factor: cli.scale_factor,
        min_neighbors: cli.min_neighbors,
        min_size: (cli.min_size, cli.min_size),
    }
    .validate()?;
    if cli.remote_timeout_ms == 0 {
        return Err("Remote timeout must be at least 1 ms".into());
    }
    if cli.region.trim().is_empty() {
        return Err("AWS region must not be empty".into());
    }
    if cli.on_remote_error != "skip" && cli.on_remote_error != "abort" {
        return Err(format!(
            "On-remote-error must be 'skip' or 'abort', got '{}'",
            cli.on_remote_error
        )
        .into());
    }
    if cli.output.extension().is_none() {
        return Err(format!(
            "Output path needs an extension to pick a container, got {}",
            cli.output.display()
        )
        .into());
    }
    Ok(())
}

fn parse_failure_policy(value: &str) -> RemoteFailurePolicy {
    if value == "abort" {
        RemoteFailurePolicy::Abort
    } else {
        RemoteFailurePolicy::SkipFrame
    }
}

fn parse_remote_invocation(once_per_frame: bool) -> RemoteInvocation {
    if once_per_frame {
        RemoteInvocation::OncePerFrame
    } else {
        RemoteInvocation::PerLocalFace
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading cascade model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading cascade model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["face-annotate"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn existing_input() -> tempfile::NamedTempFile {
        tempfile::Builder::new().suffix(".mp4").tempfile().unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["man.mp4"]);
        assert_eq!(cli.output, PathBuf::from("output_video.avi"));
        assert_eq!(cli.fps, 10.0);
        assert_eq!(cli.scale_factor, 1.1);
        assert_eq!(cli.min_neighbors, 5);
        assert_eq!(cli.min_size, 30);
        assert_eq!(cli.region, "us-east-1");
        assert_eq!(cli.remote_timeout_ms, 10_000);
        assert_eq!(cli.retries, 2);
        assert_eq!(cli.on_remote_error, "skip");
        assert!(!cli.remote_once_per_frame);
        assert!(!cli.no_keyboard);
    }

    #[test]
    fn test_valid_cli_passes() {
        let input = existing_input();
        let cli = parse(&[input.path().to_str().unwrap()]);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_missing_input_rejected() {
        let cli = parse(&["/nonexistent/man.mp4"]);
        let err = validate(&cli).unwrap_err();
        assert!(err.to_string().contains("Input file not found"));
    }

    #[test]
    fn test_bad_values_rejected() {
        let input = existing_input();
        let path = input.path().to_str().unwrap();
        for args in [
            vec![path, "--fps", "0"],
            vec![path, "--scale-factor", "1.0"],
            vec![path, "--min-size", "0", "--scale-factor", "0.9"],
            vec![path, "--remote-timeout-ms", "0"],
            vec![path, "--on-remote-error", "retry"],
            vec![path, "--output", "annotated"],
        ] {
            let cli = parse(&args);
            assert!(validate(&cli).is_err(), "accepted {args:?}");
        }
    }

    #[test]
    fn test_policy_and_invocation_mapping() {
        assert_eq!(parse_failure_policy("abort"), RemoteFailurePolicy::Abort);
        assert_eq!(parse_failure_policy("skip"), RemoteFailurePolicy::SkipFrame);
        assert_eq!(
            parse_remote_invocation(true),
            RemoteInvocation::OncePerFrame
        );
        assert_eq!(
            parse_remote_invocation(false),
            RemoteInvocation::PerLocalFace
        );
    }

    #[test]
    fn test_abort_keys() {
        let press = |code, modifiers| KeyEvent::new(code, modifiers);
        assert!(is_abort_key(&press(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_abort_key(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_abort_key(&press(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_abort_key(&press(KeyCode::Enter, KeyModifiers::NONE)));
    }
}
