//! Prefix codec: turns frames into wire bytes and back.
//!
//! The wire format has no length prefix and no terminator. A frame is
//! whatever one transport read delivered, recognised by its first bytes:
//!
//! ```text
//! Message frame : "MSG:" <utf8-text>
//! File header   : "FILE:" <basename> ":" <decimal-size>
//! Plain/legacy  : any bytes with neither prefix
//! ```

use crate::{Frame, ProtocolError, sanitize_file_name};

/// Prefix of a message frame.
pub const MESSAGE_PREFIX: &[u8] = b"MSG:";

/// Prefix of a file header frame.
pub const FILE_PREFIX: &[u8] = b"FILE:";

/// Encodes `text` as a message frame.
///
/// ```rust
/// use ndog_protocol::{decode, encode_message, Frame};
///
/// let bytes = encode_message("Hello from ndog!");
/// assert_eq!(bytes, b"MSG:Hello from ndog!");
/// assert_eq!(decode(&bytes).unwrap(), Frame::Message("Hello from ndog!".into()));
/// ```
pub fn encode_message(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(MESSAGE_PREFIX.len() + text.len());
    out.extend_from_slice(MESSAGE_PREFIX);
    out.extend_from_slice(text.as_bytes());
    out
}

/// Encodes a file header. `name` is reduced to its base name first.
///
/// # Errors
/// Returns `ProtocolError::InvalidFileName` if the base name is empty or
/// contains `:`, which the header format cannot carry.
pub fn encode_file_header(name: &str, size: u64) -> Result<Vec<u8>, ProtocolError> {
    let name = sanitize_file_name(name)?;
    Ok(format!("FILE:{name}:{size}").into_bytes())
}

/// Decodes one complete read into a [`Frame`].
///
/// `MSG:` frames must be valid UTF-8. `FILE:` frames must be exactly
/// `FILE:<name>:<digits>`. Anything else is [`Frame::RawText`] and never
/// fails: undecodable bytes become U+FFFD.
pub fn decode(bytes: &[u8]) -> Result<Frame, ProtocolError> {
    let (frame, rest) = decode_prefix(bytes)?;
    if !rest.is_empty() {
        return Err(ProtocolError::MalformedHeader(format!(
            "{} unexpected bytes after size",
            rest.len()
        )));
    }
    Ok(frame)
}

/// Decodes the frame at the start of `bytes` and returns any trailing bytes.
///
/// Only file headers can leave trailing bytes: the size ends at its last
/// decimal digit, and whatever follows in the same read is the start of
/// the file body (TCP is free to deliver header and body together).
pub fn decode_prefix(bytes: &[u8]) -> Result<(Frame, &[u8]), ProtocolError> {
    if let Some(text) = bytes.strip_prefix(MESSAGE_PREFIX) {
        let text = std::str::from_utf8(text)?;
        return Ok((Frame::Message(text.to_string()), &[]));
    }

    if let Some(header) = bytes.strip_prefix(FILE_PREFIX) {
        return decode_file_header(header);
    }

    Ok((Frame::RawText(String::from_utf8_lossy(bytes).into_owned()), &[]))
}

/// Parses `<name>:<size>` with at most one split on `:`.
fn decode_file_header(header: &[u8]) -> Result<(Frame, &[u8]), ProtocolError> {
    let split = header
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| ProtocolError::MalformedHeader("missing ':' before size".into()))?;
    let (name, size) = (&header[..split], &header[split + 1..]);

    let name = std::str::from_utf8(name)
        .map_err(|e| ProtocolError::MalformedHeader(format!("file name is not UTF-8: {e}")))?;
    if name.is_empty() {
        return Err(ProtocolError::MalformedHeader("empty file name".into()));
    }

    let digits = size.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return Err(ProtocolError::MalformedHeader(
            "size is not a non-negative decimal number".into(),
        ));
    }
    // Only ASCII digits here, so the UTF-8 conversion cannot fail.
    let size_text = std::str::from_utf8(&size[..digits])
        .map_err(|e| ProtocolError::MalformedHeader(e.to_string()))?;
    let size_value: u64 = size_text
        .parse()
        .map_err(|e| ProtocolError::MalformedHeader(format!("size {size_text}: {e}")))?;

    Ok((
        Frame::FileHeader {
            name: name.to_string(),
            size: size_value,
        },
        &size[digits..],
    ))
}
