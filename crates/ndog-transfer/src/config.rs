//! Transfer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the file transfer engine.
///
/// Defaults follow the wire behaviour peers expect; tests usually zero
/// the delays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Bytes per body write. Default: 64 KiB.
    ///
    /// UDP chunks are further capped at the largest datagram payload.
    pub chunk_size: usize,

    /// Pause after the header before the first body byte, so the receiver
    /// reads the header on its own. Default: 100 ms.
    pub header_settle: Duration,

    /// Pause between UDP body datagrams. Default: 10 ms. Ignored for TCP.
    pub udp_chunk_delay: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            header_settle: Duration::from_millis(100),
            udp_chunk_delay: Duration::from_millis(10),
        }
    }
}

impl TransferConfig {
    /// Default body chunk size.
    pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

    /// Creates a config with the given chunk size and default delays.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Default::default()
        }
    }

    /// Fixes out-of-range values: a zero chunk size becomes 1.
    pub fn validated(mut self) -> Self {
        if self.chunk_size == 0 {
            tracing::warn!("chunk_size of 0 is invalid, using 1");
            self.chunk_size = 1;
        }
        self
    }
}
