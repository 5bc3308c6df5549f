//! [`Endpoint`] and [`Listener`]: opening, using, and closing one connection.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::watch;

use crate::tcp::TcpLink;
use crate::udp::UdpLink;
use crate::{Connection, Inbound, Role, TransportConfig, TransportError, TransportMode};

enum Link {
    Tcp(TcpLink),
    Udp(UdpLink),
}

/// How an endpoint was opened, kept so it can be opened again.
#[derive(Debug, Clone)]
enum Origin {
    Connect { host: String, port: u16 },
    Listen { port: u16 },
}

/// The live socket for one connection, TCP or UDP.
///
/// Methods take `&self` so an `Arc<Endpoint>` can be shared between a
/// reader task and a writer. Reads and writes never wait on each other.
pub struct Endpoint {
    link: Link,
    mode: TransportMode,
    role: Role,
    origin: Origin,
    config: TransportConfig,
    closed: watch::Sender<bool>,
}

impl Endpoint {
    fn new(
        link: Link,
        mode: TransportMode,
        role: Role,
        origin: Origin,
        config: TransportConfig,
    ) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            link,
            mode,
            role,
            origin,
            config,
            closed,
        }
    }

    /// Resolves `host` and opens a connection to it.
    ///
    /// For TCP each resolved address is tried in turn. For UDP a local
    /// socket is bound and the first resolved address becomes the peer.
    pub async fn connect(
        host: &str,
        port: u16,
        mode: TransportMode,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let addrs = resolve(host, port).await?;
        let link = match mode {
            TransportMode::Tcp => {
                Link::Tcp(TcpLink::connect(&addrs, config.connect_timeout).await?)
            }
            TransportMode::Udp => {
                let peer = addrs[0];
                let local: SocketAddr = if peer.is_ipv4() {
                    (Ipv4Addr::UNSPECIFIED, 0).into()
                } else {
                    (Ipv6Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(local).await.map_err(|source| {
                    TransportError::BindFailed {
                        addr: local.to_string(),
                        source,
                    }
                })?;
                Link::Udp(UdpLink::new(socket, Some(peer))?)
            }
        };
        let endpoint = Self::new(
            link,
            mode,
            Role::Initiator,
            Origin::Connect {
                host: host.to_string(),
                port,
            },
            config,
        );
        tracing::info!(
            %mode,
            local = %endpoint.local_addr(),
            peer = ?endpoint.peer_addr(),
            "connected"
        );
        Ok(endpoint)
    }

    /// Binds `port` and waits for the peer. Shortcut for
    /// [`Listener::bind`] followed by [`Listener::accept`].
    pub async fn listen(
        port: u16,
        mode: TransportMode,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        Listener::bind(port, mode, config).await?.accept().await
    }

    /// Opens a fresh endpoint with the parameters that opened this one.
    pub async fn reopen(&self) -> Result<Self, TransportError> {
        match &self.origin {
            Origin::Connect { host, port } => {
                Self::connect(host, *port, self.mode, self.config.clone()).await
            }
            Origin::Listen { port } => {
                Self::listen(*port, self.mode, self.config.clone()).await
            }
        }
    }

    /// The role this endpoint was opened with.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The locally bound address.
    pub fn local_addr(&self) -> SocketAddr {
        match &self.link {
            Link::Tcp(tcp) => tcp.local_addr(),
            Link::Udp(udp) => udp.local_addr(),
        }
    }

    /// The peer address: fixed for TCP, the implicit peer for UDP.
    ///
    /// A UDP responder has no peer until its first datagram arrives.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match &self.link {
            Link::Tcp(tcp) => Some(tcp.peer_addr()),
            Link::Udp(udp) => udp.peer_addr(),
        }
    }

    /// Overrides the UDP reply target. Returns `false` for TCP, whose peer
    /// is fixed for the connection's lifetime.
    pub fn set_peer(&self, addr: SocketAddr) -> bool {
        match &self.link {
            Link::Tcp(_) => false,
            Link::Udp(udp) => {
                udp.set_peer(addr);
                true
            }
        }
    }
}

impl Connection for Endpoint {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(TransportError::Shutdown);
        }

        let write = async {
            match &self.link {
                Link::Tcp(tcp) => tcp.send(data).await,
                Link::Udp(udp) => udp.send(data).await,
            }
        };

        // A write stalled on a full buffer gives way to a local close.
        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Err(TransportError::Shutdown),
            result = write => result,
        }
    }

    async fn recv(&self, max_len: usize) -> Result<Option<Inbound>, TransportError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Ok(None);
        }

        let read = async {
            match &self.link {
                Link::Tcp(tcp) => tcp.recv(max_len).await.map(|read| {
                    read.map(|bytes| Inbound {
                        bytes,
                        from: tcp.peer_addr(),
                    })
                }),
                Link::Udp(udp) => udp.recv().await,
            }
        };

        // A local close wakes the pending read so the reader task can exit.
        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Ok(None),
            result = read => result,
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        let first = self.closed.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        });
        if !first {
            return Ok(());
        }

        match &self.link {
            Link::Tcp(tcp) => tcp.shutdown().await,
            Link::Udp(udp) => udp.shutdown(),
        }
        tracing::debug!(mode = %self.mode, "endpoint closed");
        Ok(())
    }

    fn mode(&self) -> TransportMode {
        self.mode
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// A bound but not yet connected responder socket.
///
/// Split from [`Endpoint::listen`] so callers can learn the bound port
/// (e.g. after binding port 0) before blocking on the peer.
pub struct Listener {
    inner: ListenerInner,
    port: u16,
    config: TransportConfig,
}

enum ListenerInner {
    Tcp(TcpListener),
    Udp(UdpSocket),
}

impl Listener {
    /// Binds `config.bind_host:port`.
    pub async fn bind(
        port: u16,
        mode: TransportMode,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let addr = format!("{}:{port}", config.bind_host);
        let bind_err = |source| TransportError::BindFailed {
            addr: addr.clone(),
            source,
        };
        let inner = match mode {
            TransportMode::Tcp => {
                ListenerInner::Tcp(TcpListener::bind(addr.as_str()).await.map_err(bind_err)?)
            }
            TransportMode::Udp => {
                ListenerInner::Udp(UdpSocket::bind(addr.as_str()).await.map_err(bind_err)?)
            }
        };
        let mut listener = Self { inner, port, config };
        // Remember the real port so a reopen rebinds the same one.
        if let (0, Ok(local)) = (port, listener.local_addr()) {
            listener.port = local.port();
        }
        tracing::info!(%addr, port = listener.port, %mode, "listening");
        Ok(listener)
    }

    /// The bound address (useful after binding port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        match &self.inner {
            ListenerInner::Tcp(listener) => listener.local_addr(),
            ListenerInner::Udp(socket) => socket.local_addr(),
        }
    }

    /// Waits for the single peer.
    ///
    /// TCP blocks until one connection arrives; the listening socket is
    /// dropped afterwards so later peers are refused. UDP returns at once
    /// with no peer; the first datagram's sender becomes the peer.
    pub async fn accept(self) -> Result<Endpoint, TransportError> {
        let origin = Origin::Listen { port: self.port };
        match self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, addr) = listener
                    .accept()
                    .await
                    .map_err(TransportError::AcceptFailed)?;
                tracing::info!(%addr, "accepted connection");
                Ok(Endpoint::new(
                    Link::Tcp(TcpLink::from_stream(stream)?),
                    TransportMode::Tcp,
                    Role::Responder,
                    origin,
                    self.config,
                ))
            }
            ListenerInner::Udp(socket) => Ok(Endpoint::new(
                Link::Udp(UdpLink::new(socket, None)?),
                TransportMode::Udp,
                Role::Responder,
                origin,
                self.config,
            )),
        }
    }
}

async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, TransportError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| TransportError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();
    if addrs.is_empty() {
        return Err(TransportError::Resolve {
            host: host.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no addresses returned",
            ),
        });
    }
    Ok(addrs)
}
