//! The [`Frame`] type: one decoded unit of protocol meaning.

use std::fmt;

use crate::{ProtocolError, codec};

/// A frame as it travels on the wire.
///
/// Decoded once at the boundary by [`decode`](crate::decode), then matched
/// exhaustively by whichever engine is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `MSG:<text>`: one complete text message.
    Message(String),

    /// `FILE:<name>:<size>`: metadata for the file body that follows.
    ///
    /// The next `size` bytes read from the same endpoint are body bytes,
    /// whatever they look like.
    FileHeader { name: String, size: u64 },

    /// Bytes with neither prefix: a legacy chat line, decoded lossily.
    RawText(String),
}

impl Frame {
    /// Re-encodes this frame to its wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Message(text) => Ok(codec::encode_message(text)),
            Self::FileHeader { name, size } => codec::encode_file_header(name, *size),
            Self::RawText(text) => Ok(text.as_bytes().to_vec()),
        }
    }

    /// Short name of the frame kind, for logs and error messages.
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Message(_) => FrameKind::Message,
            Self::FileHeader { .. } => FrameKind::FileHeader,
            Self::RawText(_) => FrameKind::RawText,
        }
    }
}

/// The discriminant of a [`Frame`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Message,
    FileHeader,
    RawText,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::FileHeader => write!(f, "file header"),
            Self::RawText => write!(f, "raw text"),
        }
    }
}

/// Reduces `name` to a base file name that can be carried in a header.
///
/// Strips every `/` or `\` path component. Rejects names that end up
/// empty, are `.` or `..`, or contain the `:` delimiter.
pub fn sanitize_file_name(name: &str) -> Result<String, ProtocolError> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." || base.contains(':') {
        return Err(ProtocolError::InvalidFileName(name.to_string()));
    }
    Ok(base.to_string())
}
