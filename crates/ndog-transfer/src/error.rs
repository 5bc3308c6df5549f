//! Error types for the transfer engines.

use std::path::PathBuf;

use ndog_protocol::ProtocolError;
use ndog_transport::TransportError;

use crate::TransferProgress;

/// Errors from sending or receiving a message or a file.
///
/// Engines fail fast: nothing here is retried, and a short transfer is
/// never reported as a success.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The connection failed outside of a body transfer.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bytes on the wire did not form a valid frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The encoded frame does not fit in one UDP datagram.
    #[error("payload of {size} bytes exceeds the {limit}-byte datagram limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The file to send does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file to send exists but cannot be read.
    #[error("cannot read {}: {source}", .path.display())]
    NotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination cannot be opened for writing.
    #[error("cannot write {}: {source}", .path.display())]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A body read or write failed part way through.
    ///
    /// `progress` keeps how far the transfer got, for diagnostics.
    #[error("transfer failed at {progress}: {source}")]
    TransferFailed {
        progress: TransferProgress,
        #[source]
        source: FailureCause,
    },

    /// The peer closed the connection before the declared size arrived.
    /// The partial file is left at `path`.
    #[error("incomplete transfer of {}: {progress}", .path.display())]
    IncompleteTransfer {
        path: PathBuf,
        progress: TransferProgress,
    },

    /// A frame arrived that the current engine cannot handle.
    #[error("expected {expected}, got {found}")]
    UnexpectedFrame {
        expected: &'static str,
        found: String,
    },
}

/// What interrupted a transfer.
#[derive(Debug, thiserror::Error)]
pub enum FailureCause {
    #[error(transparent)]
    Transport(TransportError),

    #[error(transparent)]
    Io(std::io::Error),

    /// The endpoint was closed locally (e.g. on interrupt).
    #[error("endpoint closed locally")]
    Cancelled,
}

impl TransferError {
    pub(crate) fn failed(progress: TransferProgress, source: FailureCause) -> Self {
        Self::TransferFailed { progress, source }
    }
}
