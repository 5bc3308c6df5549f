//! Errors that end a chat session.

use std::path::PathBuf;

use ndog_transfer::TransferError;
use ndog_transport::TransportError;

/// A fatal chat error. Per-frame problems are rendered and logged instead.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The endpoint failed and cannot carry the session further.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Sending a message failed in a way the session cannot recover from.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The transcript file could not be opened.
    #[error("cannot open transcript {}: {source}", path.display())]
    Transcript {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading the keyboard or writing the screen failed.
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}
