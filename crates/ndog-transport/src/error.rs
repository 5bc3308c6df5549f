use std::net::SocketAddr;

/// Errors that can occur in the transport layer.
///
/// Every socket failure ends up here with the underlying `io::Error`
/// attached. Nothing in this crate retries on its own.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host name could not be resolved to any address.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// Connecting to the remote peer failed or was refused.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Connecting did not finish within the configured timeout.
    #[error("connect to {0} timed out")]
    ConnectTimeout(SocketAddr),

    /// Binding the local socket failed.
    #[error("bind to {addr} failed: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting the incoming connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A UDP endpoint has not seen a peer yet, so there is nobody to send to.
    #[error("no peer address known yet")]
    NoPeer,

    /// The endpoint was closed locally.
    #[error("endpoint closed")]
    Shutdown,
}
