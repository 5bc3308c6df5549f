//! Byte-progress accounting for one transfer.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// How far a transfer has got. Recomputed after every chunk.
///
/// `bytes_transferred` never exceeds `total_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl TransferProgress {
    /// A transfer of `total_bytes` that has not started.
    pub fn new(total_bytes: u64) -> Self {
        Self {
            bytes_transferred: 0,
            total_bytes,
        }
    }

    /// Records `n` more bytes, clamped to the total.
    pub fn advance(&mut self, n: u64) {
        self.bytes_transferred = self
            .bytes_transferred
            .saturating_add(n)
            .min(self.total_bytes);
    }

    /// Bytes still expected.
    pub fn remaining(&self) -> u64 {
        self.total_bytes - self.bytes_transferred
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_transferred == self.total_bytes
    }

    /// Completed fraction in `0.0..=1.0`. An empty file counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            self.bytes_transferred as f64 / self.total_bytes as f64
        }
    }
}

impl fmt::Display for TransferProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} bytes ({:.0}%)",
            self.bytes_transferred,
            self.total_bytes,
            self.fraction() * 100.0
        )
    }
}

/// Report of a finished transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSummary {
    /// Base file name carried in the header.
    pub name: String,
    /// Local file read from (send) or written to (receive).
    pub path: PathBuf,
    /// Final progress; always complete.
    pub progress: TransferProgress,
    /// Number of body reads or writes.
    pub chunks: u64,
    pub elapsed: Duration,
}
