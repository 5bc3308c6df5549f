//! Unified error type for ndog.

use ndog_chat::ChatError;
use ndog_protocol::ProtocolError;
use ndog_transfer::TransferError;
use ndog_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` conversions let `?` lift sub-crate errors, and
/// [`NdogError::kind`] collapses them into one flat [`ErrorKind`] for
/// callers that only need to know what class of failure happened.
#[derive(Debug, thiserror::Error)]
pub enum NdogError {
    /// Opening or using the socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bytes on the wire did not decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A message or file operation failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The chat session failed.
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// The initiator role was chosen without a host to connect to.
    #[error("no host given to connect to")]
    MissingHost,
}

/// The failure classes an ndog run can end with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Protocol,
    PayloadTooLarge,
    FileNotFound,
    NotReadable,
    NotWritable,
    TransferFailed,
    IncompleteTransfer,
    UnexpectedFrameKind,
    Terminal,
}

impl NdogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::MissingHost => ErrorKind::Connection,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Transfer(e) => transfer_kind(e),
            Self::Chat(ChatError::Transport(_)) => ErrorKind::Connection,
            Self::Chat(ChatError::Transfer(e)) => transfer_kind(e),
            Self::Chat(ChatError::Terminal(_)) => ErrorKind::Terminal,
            Self::Chat(ChatError::Transcript { .. }) => ErrorKind::NotWritable,
        }
    }
}

fn transfer_kind(error: &TransferError) -> ErrorKind {
    match error {
        TransferError::Transport(_) => ErrorKind::Connection,
        TransferError::Protocol(_) => ErrorKind::Protocol,
        TransferError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
        TransferError::FileNotFound(_) => ErrorKind::FileNotFound,
        TransferError::NotReadable { .. } => ErrorKind::NotReadable,
        TransferError::NotWritable { .. } => ErrorKind::NotWritable,
        TransferError::TransferFailed { .. } => ErrorKind::TransferFailed,
        TransferError::IncompleteTransfer { .. } => ErrorKind::IncompleteTransfer,
        TransferError::UnexpectedFrame { .. } => ErrorKind::UnexpectedFrameKind,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let ndog_err: NdogError = err.into();
        assert!(matches!(ndog_err, NdogError::Transport(_)));
        assert!(ndog_err.to_string().contains("gone"));
        assert_eq!(ndog_err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::MalformedHeader("bad".into());
        let ndog_err: NdogError = err.into();
        assert!(matches!(ndog_err, NdogError::Protocol(_)));
        assert_eq!(ndog_err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_transfer_kinds() {
        let cases = [
            (
                TransferError::FileNotFound(PathBuf::from("x")),
                ErrorKind::FileNotFound,
            ),
            (
                TransferError::PayloadTooLarge {
                    size: 70_000,
                    limit: 65_507,
                },
                ErrorKind::PayloadTooLarge,
            ),
            (
                TransferError::UnexpectedFrame {
                    expected: "message",
                    found: "file header".into(),
                },
                ErrorKind::UnexpectedFrameKind,
            ),
            (
                TransferError::Transport(TransportError::NoPeer),
                ErrorKind::Connection,
            ),
            (
                TransferError::Protocol(ProtocolError::InvalidFileName("a:b".into())),
                ErrorKind::Protocol,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(NdogError::from(err).kind(), kind);
        }
    }

    #[test]
    fn test_chat_kinds() {
        let terminal = ChatError::Terminal(std::io::Error::other("tty gone"));
        assert_eq!(NdogError::from(terminal).kind(), ErrorKind::Terminal);

        let transport = ChatError::Transport(TransportError::Shutdown);
        assert_eq!(NdogError::from(transport).kind(), ErrorKind::Connection);

        let transcript = ChatError::Transcript {
            path: PathBuf::from("/nowhere/chat.log"),
            source: std::io::Error::other("denied"),
        };
        assert_eq!(NdogError::from(transcript).kind(), ErrorKind::NotWritable);
    }
}
