//! TCP stream link.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use crate::TransportError;

/// A connected TCP stream split into halves so a pending read never
/// blocks a write.
pub(crate) struct TcpLink {
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    local: SocketAddr,
    peer: SocketAddr,
}

impl TcpLink {
    /// Connects to the first of `addrs` that accepts.
    pub(crate) async fn connect(
        addrs: &[SocketAddr],
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut last_err = None;
        for &addr in addrs {
            let attempt = TcpStream::connect(addr);
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, attempt).await {
                    Ok(result) => result,
                    Err(_) => {
                        last_err = Some(TransportError::ConnectTimeout(addr));
                        continue;
                    }
                },
                None => attempt.await,
            };
            match result {
                Ok(stream) => return Self::from_stream(stream),
                Err(source) => {
                    tracing::debug!(%addr, error = %source, "connect attempt failed");
                    last_err = Some(TransportError::ConnectFailed { addr, source });
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            TransportError::ConnectionClosed("no address to connect to".into())
        }))
    }

    pub(crate) fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        let local = stream.local_addr().map_err(TransportError::AcceptFailed)?;
        let peer = stream.peer_addr().map_err(TransportError::AcceptFailed)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            local,
            peer,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub(crate) fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub(crate) async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        let writer = writer.as_mut().ok_or(TransportError::Shutdown)?;
        // `write_all` loops over partial writes until every byte is queued.
        writer.write_all(data).await.map_err(TransportError::SendFailed)
    }

    pub(crate) async fn recv(
        &self,
        max_len: usize,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        let Some(reader) = reader.as_mut() else {
            return Ok(None);
        };
        let mut buf = vec![0u8; max_len.max(1)];
        let n = reader
            .read(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    /// Sends FIN and drops both halves, releasing the socket.
    pub(crate) async fn shutdown(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(error = %e, "tcp shutdown failed");
            }
        }
        self.reader.lock().await.take();
    }
}
