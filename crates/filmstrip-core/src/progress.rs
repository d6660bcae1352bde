use tracing::info;

/// Receives frame-count progress from the extractor.
///
/// Passed in explicitly so callers decide where progress goes (a terminal bar, the log,
/// nowhere) without the pipeline touching global state.
pub trait ProgressReporter {
    /// Called once before the first frame, with the upper bound if one is known.
    fn start(&self, _total: Option<u64>) {}

    /// Called after each frame is appended; `processed` only ever increases.
    fn advance(&self, processed: usize);

    /// Called once after the last frame.
    fn finish(&self, _processed: usize) {}
}

/// Discards all progress.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn advance(&self, _processed: usize) {}
}

/// Reports progress as tracing events.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn start(&self, total: Option<u64>) {
        info!(total = ?total, "processing frames");
    }

    fn advance(&self, processed: usize) {
        info!(frames_processed = processed, "frame processed");
    }

    fn finish(&self, processed: usize) {
        info!(frames_processed = processed, "frame processing finished");
    }
}
