//! In-memory [`Connection`] used by the engine unit tests.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use ndog_transport::{Connection, Inbound, TransportError, TransportMode};

pub(crate) struct MockConnection {
    mode: TransportMode,
    sent: Mutex<Vec<Vec<u8>>>,
    inbound: Mutex<VecDeque<Vec<u8>>>,
    closed: AtomicBool,
    /// Sends fail once this many have succeeded.
    fail_after: Option<usize>,
}

impl MockConnection {
    pub(crate) fn new(mode: TransportMode) -> Self {
        Self {
            mode,
            sent: Mutex::new(Vec::new()),
            inbound: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
            fail_after: None,
        }
    }

    pub(crate) fn failing_after(mut self, sends: usize) -> Self {
        self.fail_after = Some(sends);
        self
    }

    /// Queues bytes for the next `recv`. Reads after the queue drains
    /// return `None` (peer closed).
    pub(crate) fn push_inbound(&self, bytes: &[u8]) {
        self.inbound.lock().unwrap().push_back(bytes.to_vec());
    }

    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn peer() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }
}

impl Connection for MockConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut sent = self.sent.lock().unwrap();
        if self.fail_after.is_some_and(|limit| sent.len() >= limit) {
            return Err(TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock send failure",
            )));
        }
        sent.push(data.to_vec());
        Ok(())
    }

    async fn recv(&self, max_len: usize) -> Result<Option<Inbound>, TransportError> {
        let mut inbound = self.inbound.lock().unwrap();
        let Some(mut bytes) = inbound.pop_front() else {
            return Ok(None);
        };
        // Mimic a stream read: hand back at most `max_len`, keep the rest.
        if self.mode == TransportMode::Tcp && bytes.len() > max_len {
            let rest = bytes.split_off(max_len);
            inbound.push_front(rest);
        }
        Ok(Some(Inbound {
            bytes,
            from: Self::peer(),
        }))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn mode(&self) -> TransportMode {
        self.mode
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
