//! Transport layer for ndog.
//!
//! Provides the [`Connection`] trait and the [`Endpoint`] that implements it
//! over exactly one TCP stream or one UDP socket.
//!
//! # Roles
//!
//! - **Initiator**: [`Endpoint::connect`] resolves a host and connects.
//! - **Responder**: [`Listener::bind`] then [`Listener::accept`] (or the
//!   [`Endpoint::listen`] shortcut). TCP accepts a single peer; UDP has no
//!   accept step and learns its peer from the first datagram.
//!
//! # UDP implicit peer
//!
//! A UDP endpoint sends to the address it last received a datagram from.
//! An initiator starts with the resolved remote address as its peer.

#![allow(async_fn_in_trait)]

mod config;
mod endpoint;
mod error;
mod tcp;
mod udp;

pub use config::TransportConfig;
pub use endpoint::{Endpoint, Listener};
pub use error::TransportError;

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Largest payload a single IPv4 UDP datagram can carry.
pub const UDP_MAX_PAYLOAD: usize = 65_507;

/// Receive buffer used for one UDP datagram.
pub const UDP_RECV_BUFFER: usize = 64 * 1024;

/// Which transport protocol an endpoint speaks. Fixed for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportMode {
    Tcp,
    Udp,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
        }
    }
}

/// Which side of the connection this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Connected out to a remote host.
    Initiator,
    /// Listened on a local port and accepted (or awaited) the peer.
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiator => write!(f, "initiator"),
            Self::Responder => write!(f, "responder"),
        }
    }
}

/// One successful receive: the bytes and who sent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub bytes: Vec<u8>,
    pub from: SocketAddr,
}

/// A single live connection that can send and receive bytes.
pub trait Connection: Send + Sync {
    /// Sends `data` to the peer.
    ///
    /// TCP writes every byte before returning. UDP sends exactly one
    /// datagram to the implicit peer; callers must not assume separate
    /// calls are coalesced or split.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receives the next chunk of bytes.
    ///
    /// TCP returns between 1 and `max_len` bytes. UDP returns exactly one
    /// datagram regardless of `max_len`. Returns `Ok(None)` when the peer
    /// closed the stream or the endpoint was closed locally.
    async fn recv(&self, max_len: usize) -> Result<Option<Inbound>, TransportError>;

    /// Closes the connection. Calling it again is a no-op.
    async fn close(&self) -> Result<(), TransportError>;

    /// The transport protocol in use.
    fn mode(&self) -> TransportMode;

    /// Returns `true` once [`close`](Self::close) has been called locally.
    fn is_closed(&self) -> bool;
}
