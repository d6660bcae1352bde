use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use filmstrip_core::ProgressReporter;

/// Terminal progress bar over the frames being normalized.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
        let style = ProgressStyle::with_template(
            "{msg:.green} {percent:>3}% {bar:40.green/blue} {pos}/{len} frames [{elapsed_precise}<{eta_precise}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("##-"));
        bar.set_message("Processing frames:");
        Self { bar }
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, total: Option<u64>) {
        if let Some(total) = total {
            self.bar.set_length(total);
        }
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
    }

    fn advance(&self, processed: usize) {
        self.bar.set_position(processed as u64);
    }

    fn finish(&self, _processed: usize) {
        self.bar.finish();
    }
}
