//! Message engine: one text frame out, one text frame in.

use std::net::SocketAddr;

use ndog_protocol::{Frame, decode, encode_message};
use ndog_transport::{Connection, TransportError, TransportMode, UDP_MAX_PAYLOAD};

use crate::error::FailureCause;
use crate::{TransferError, TransferProgress};

/// Largest read used to receive one message.
const MESSAGE_READ_SIZE: usize = 64 * 1024;

/// A message taken off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub text: String,
    /// The sender, for UDP, so the caller can reply to the right peer.
    pub from: Option<SocketAddr>,
}

/// Sends `text` as one message frame in a single write or datagram.
///
/// # Errors
/// `PayloadTooLarge` if the frame cannot fit in one UDP datagram; a
/// transport error if the write fails.
pub async fn send_message<C: Connection>(conn: &C, text: &str) -> Result<(), TransferError> {
    let frame = encode_message(text);
    if conn.mode() == TransportMode::Udp && frame.len() > UDP_MAX_PAYLOAD {
        return Err(TransferError::PayloadTooLarge {
            size: frame.len(),
            limit: UDP_MAX_PAYLOAD,
        });
    }
    conn.send(&frame).await?;
    tracing::debug!(bytes = frame.len(), "message sent");
    Ok(())
}

/// Performs one receive and decodes it as a text message.
///
/// Legacy raw text is accepted as a message. A file header or a frame that
/// fails to decode is reported as `UnexpectedFrame` rather than coerced.
pub async fn receive_message<C: Connection>(conn: &C) -> Result<ReceivedMessage, TransferError> {
    let Some(inbound) = conn.recv(MESSAGE_READ_SIZE).await? else {
        if conn.is_closed() {
            return Err(TransferError::failed(
                TransferProgress::new(0),
                FailureCause::Cancelled,
            ));
        }
        return Err(
            TransportError::ConnectionClosed("peer closed before sending a message".into()).into(),
        );
    };

    let text = match decode(&inbound.bytes) {
        Ok(Frame::Message(text)) | Ok(Frame::RawText(text)) => text,
        Ok(frame @ Frame::FileHeader { .. }) => {
            return Err(TransferError::UnexpectedFrame {
                expected: "message",
                found: frame.kind().to_string(),
            });
        }
        Err(e) => {
            return Err(TransferError::UnexpectedFrame {
                expected: "message",
                found: format!("malformed frame ({e})"),
            });
        }
    };

    tracing::debug!(from = %inbound.from, bytes = inbound.bytes.len(), "message received");
    let from = (conn.mode() == TransportMode::Udp).then_some(inbound.from);
    Ok(ReceivedMessage { text, from })
}
