//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes themselves were wrong. Socket
//! trouble lives in `TransportError`, file trouble in the transfer layer.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A `MSG:` frame whose payload is not valid UTF-8.
    #[error("message frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A `FILE:` frame that does not parse as `FILE:<name>:<size>`.
    ///
    /// The string describes what was wrong (missing size, bad digits, ...).
    #[error("malformed file header: {0}")]
    MalformedHeader(String),

    /// A file name that cannot be carried in a header.
    ///
    /// The header uses `:` as its delimiter, so names containing `:` (or
    /// names that are empty once path components are stripped) are
    /// rejected instead of producing an unparsable frame.
    #[error("invalid file name for transfer: {0:?}")]
    InvalidFileName(String),
}
