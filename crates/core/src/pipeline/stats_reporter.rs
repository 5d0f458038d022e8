use std::io::{self, Write};
use std::path::Path;

use crate::pipeline::run_stats::RunStats;

/// The two console lines printed when a run finishes.
pub fn summary_lines(stats: &RunStats, output_path: &Path) -> [String; 2] {
    [
        format!(
            "Face detection on {} out of {} frames. Detection Percentage: {:.2}%",
            stats.frames_with_face,
            stats.total_frames,
            stats.detection_percentage()
        ),
        format!(
            "Face and eye detection on video completed. Output video saved to '{}'.",
            output_path.display()
        ),
    ]
}

/// Writes the run summary to `out`, and the secondary counters to the log.
pub fn report(out: &mut impl Write, stats: &RunStats, output_path: &Path) -> io::Result<()> {
    if stats.interrupted {
        log::warn!(
            "Run interrupted after {} frames; output holds the frames written so far",
            stats.total_frames
        );
    }
    log::info!(
        "{} faces, {} eyes, {} remote calls ({} skipped)",
        stats.faces_detected,
        stats.eyes_detected,
        stats.remote_calls,
        stats.remote_failures
    );

    for line in summary_lines(stats, output_path) {
        writeln!(out, "{line}")?;
    }
    out.flush()
}
