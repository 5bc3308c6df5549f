//! UDP datagram link with implicit-peer tracking.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::net::UdpSocket;

use crate::{Inbound, TransportError, UDP_RECV_BUFFER};

pub(crate) struct UdpLink {
    socket: Mutex<Option<Arc<UdpSocket>>>,
    local: SocketAddr,
    /// Where unaddressed sends go. Replaced by the source of every
    /// received datagram.
    peer: Mutex<Option<SocketAddr>>,
}

impl UdpLink {
    pub(crate) fn new(
        socket: UdpSocket,
        peer: Option<SocketAddr>,
    ) -> Result<Self, TransportError> {
        let local = socket
            .local_addr()
            .map_err(|source| TransportError::BindFailed {
                addr: "udp socket".into(),
                source,
            })?;
        Ok(Self {
            socket: Mutex::new(Some(Arc::new(socket))),
            local,
            peer: Mutex::new(peer),
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub(crate) fn peer_addr(&self) -> Option<SocketAddr> {
        *self.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_peer(&self, addr: SocketAddr) {
        *self.peer.lock().unwrap_or_else(PoisonError::into_inner) = Some(addr);
    }

    fn socket(&self) -> Option<Arc<UdpSocket>> {
        self.socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let socket = self.socket().ok_or(TransportError::Shutdown)?;
        let peer = self.peer_addr().ok_or(TransportError::NoPeer)?;
        let sent = socket
            .send_to(data, peer)
            .await
            .map_err(TransportError::SendFailed)?;
        if sent != data.len() {
            return Err(TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("datagram truncated: {sent} of {} bytes sent", data.len()),
            )));
        }
        Ok(())
    }

    pub(crate) async fn recv(&self) -> Result<Option<Inbound>, TransportError> {
        let Some(socket) = self.socket() else {
            return Ok(None);
        };
        let mut buf = vec![0u8; UDP_RECV_BUFFER];
        let (n, from) = socket
            .recv_from(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        buf.truncate(n);

        let previous = self.peer_addr();
        if previous != Some(from) {
            tracing::debug!(%from, ?previous, "udp peer changed");
        }
        self.set_peer(from);

        Ok(Some(Inbound { bytes: buf, from }))
    }

    /// Drops our handle on the socket; it closes once in-flight calls finish.
    pub(crate) fn shutdown(&self) {
        self.socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
