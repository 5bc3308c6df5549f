//! Progress bars for file operations.

use indicatif::{ProgressBar, ProgressStyle};
use ndog_transfer::TransferProgress;

/// One progress bar on stderr, or nothing when disabled.
pub(crate) struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub(crate) fn new(label: String, enabled: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        bar.set_message(label);
        Self { bar }
    }

    pub(crate) fn update(&self, progress: &TransferProgress) {
        self.bar.set_length(progress.total_bytes);
        self.bar.set_position(progress.bytes_transferred);
    }

    pub(crate) fn finish(&self) {
        self.bar.finish();
    }

    pub(crate) fn abandon(&self) {
        self.bar.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_reporter_tracks_position() {
        let reporter = ProgressReporter::new("test".into(), false);
        let mut progress = TransferProgress::new(100);
        progress.advance(40);
        reporter.update(&progress);
        assert_eq!(reporter.bar.position(), 40);
        assert_eq!(reporter.bar.length(), Some(100));
        reporter.finish();
    }
}
