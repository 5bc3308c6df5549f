//! `NdogBuilder`: open one endpoint and run one operation on it.
//!
//! This is the hand-off point between a front end (the command line, a
//! test) and the engines. It ties the layers together:
//! transport → protocol → message / file / chat.

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;

use ndog_chat::SessionEnd;
use ndog_transfer::{ReceivedMessage, TransferSummary};
use ndog_transport::{Connection, Endpoint, Role, TransportMode};

use crate::progress::ProgressReporter;
use crate::{NdogConfig, NdogError};

/// The one thing a run does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    SendMessage(String),
    ReceiveMessage,
    SendFile(PathBuf),
    /// Receive into this path, or into this directory under the sender's
    /// file name.
    ReceiveFile(PathBuf),
    Chat,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    MessageSent,
    MessageReceived(ReceivedMessage),
    FileSent(TransferSummary),
    FileReceived(TransferSummary),
    ChatEnded(SessionEnd),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageSent => write!(f, "message sent"),
            Self::MessageReceived(message) => match message.from {
                Some(from) => write!(f, "[{from}] {}", message.text),
                None => write!(f, "{}", message.text),
            },
            Self::FileSent(summary) => write!(
                f,
                "sent {} ({} bytes in {:.2?})",
                summary.name, summary.progress.total_bytes, summary.elapsed
            ),
            Self::FileReceived(summary) => write!(
                f,
                "saved {} ({} bytes in {:.2?})",
                summary.path.display(),
                summary.progress.total_bytes,
                summary.elapsed
            ),
            Self::ChatEnded(end) => write!(f, "chat ended ({end:?})"),
        }
    }
}

/// Builder for one ndog run.
///
/// # Example
///
/// ```rust,no_run
/// use ndog::prelude::*;
///
/// # async fn demo() -> Result<(), NdogError> {
/// let outcome = NdogBuilder::new()
///     .connect("127.0.0.1")
///     .port(5555)
///     .run(Operation::SendMessage("Hello from ndog!".into()))
///     .await?;
/// println!("{outcome}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NdogBuilder {
    mode: TransportMode,
    role: Role,
    host: Option<String>,
    port: u16,
    config: NdogConfig,
}

impl NdogBuilder {
    /// A TCP responder on port 0 with default settings.
    pub fn new() -> Self {
        Self {
            mode: TransportMode::Tcp,
            role: Role::Responder,
            host: None,
            port: 0,
            config: NdogConfig::default(),
        }
    }

    pub fn mode(mut self, mode: TransportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the role directly. An initiator also needs [`connect`](Self::connect)
    /// or [`host`](Self::host).
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    pub fn udp(self) -> Self {
        self.mode(TransportMode::Udp)
    }

    /// Makes this run the initiator, connecting to `host`.
    pub fn connect(mut self, host: &str) -> Self {
        self.role = Role::Initiator;
        self.host = Some(host.to_string());
        self
    }

    /// Makes this run the responder, listening on the configured port.
    pub fn listen(mut self) -> Self {
        self.role = Role::Responder;
        self.host = None;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn config(mut self, config: NdogConfig) -> Self {
        self.config = config;
        self
    }

    /// Opens the endpoint described by this builder.
    pub async fn open(&self) -> Result<Endpoint, NdogError> {
        let transport = self.config.transport.clone();
        let endpoint = match self.role {
            Role::Initiator => {
                let host = self.host.as_deref().ok_or(NdogError::MissingHost)?;
                Endpoint::connect(host, self.port, self.mode, transport).await?
            }
            Role::Responder => Endpoint::listen(self.port, self.mode, transport).await?,
        };
        Ok(endpoint)
    }

    /// Opens the endpoint, runs `operation`, and closes the endpoint.
    pub async fn run(self, operation: Operation) -> Result<Outcome, NdogError> {
        let endpoint = self.open().await?;
        execute(endpoint, operation, &self.config).await
    }
}

impl Default for NdogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `operation` on an already open endpoint, then closes it.
///
/// Ctrl-C closes the endpoint; a transfer in flight then ends with
/// `TransferFailed`.
pub async fn execute(
    endpoint: Endpoint,
    operation: Operation,
    config: &NdogConfig,
) -> Result<Outcome, NdogError> {
    execute_with_cancel(endpoint, operation, config, interrupted()).await
}

/// Like [`execute`], but `cancel` stands in for Ctrl-C.
///
/// When `cancel` resolves first the endpoint is closed and the operation
/// is driven to its error, so a partial transfer reports
/// `TransferFailed` with a `Cancelled` cause. Chat sessions watch for
/// interrupts themselves and ignore `cancel`.
pub async fn execute_with_cancel<F>(
    endpoint: Endpoint,
    operation: Operation,
    config: &NdogConfig,
    cancel: F,
) -> Result<Outcome, NdogError>
where
    F: Future<Output = ()>,
{
    let config = config.clone().validated();
    tracing::debug!(?operation, mode = %endpoint.mode(), role = %endpoint.role(), "running");

    let mut work: Pin<Box<dyn Future<Output = Result<Outcome, NdogError>> + Send + '_>> =
        match operation {
            Operation::Chat => {
                // The chat session owns the endpoint and closes it itself.
                let end = ndog_chat::run_terminal(endpoint, config.chat, config.transfer).await?;
                return Ok(Outcome::ChatEnded(end));
            }
            Operation::SendMessage(text) => Box::pin(send_text(&endpoint, text)),
            Operation::ReceiveMessage => Box::pin(receive_text(&endpoint)),
            Operation::SendFile(path) => Box::pin(send_path(&endpoint, path, &config)),
            Operation::ReceiveFile(dest) => Box::pin(receive_path(&endpoint, dest, &config)),
        };

    tokio::pin!(cancel);
    let result = tokio::select! {
        result = &mut work => result,
        () = &mut cancel => {
            tracing::info!("interrupted, closing endpoint");
            // The operation keeps running while the endpoint closes so it
            // releases the socket and reports the cancellation.
            let (closed, result) = tokio::join!(endpoint.close(), &mut work);
            if let Err(e) = closed {
                tracing::debug!(error = %e, "closing endpoint failed");
            }
            result
        }
    };

    if let Err(e) = endpoint.close().await {
        tracing::debug!(error = %e, "closing endpoint failed");
    }
    result
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn send_text(endpoint: &Endpoint, text: String) -> Result<Outcome, NdogError> {
    ndog_transfer::send_message(endpoint, &text).await?;
    Ok(Outcome::MessageSent)
}

async fn receive_text(endpoint: &Endpoint) -> Result<Outcome, NdogError> {
    let message = ndog_transfer::receive_message(endpoint).await?;
    Ok(Outcome::MessageReceived(message))
}

async fn send_path(
    endpoint: &Endpoint,
    path: PathBuf,
    config: &NdogConfig,
) -> Result<Outcome, NdogError> {
    let label = format!("Sending {}", path.display());
    let reporter = ProgressReporter::new(label, config.show_progress);
    let result =
        ndog_transfer::send_file(endpoint, &path, &config.transfer, |p| reporter.update(p)).await;
    finish(&reporter, result).map(Outcome::FileSent)
}

async fn receive_path(
    endpoint: &Endpoint,
    dest: PathBuf,
    config: &NdogConfig,
) -> Result<Outcome, NdogError> {
    let reporter = ProgressReporter::new("Receiving".to_string(), config.show_progress);
    let result =
        ndog_transfer::receive_file(endpoint, &dest, &config.transfer, |p| reporter.update(p))
            .await;
    finish(&reporter, result).map(Outcome::FileReceived)
}

fn finish(
    reporter: &ProgressReporter,
    result: Result<TransferSummary, ndog_transfer::TransferError>,
) -> Result<TransferSummary, NdogError> {
    match result {
        Ok(summary) => {
            reporter.finish();
            Ok(summary)
        }
        Err(e) => {
            reporter.abandon();
            Err(e.into())
        }
    }
}
