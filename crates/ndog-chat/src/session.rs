//! The chat session: one reader task, one input source, and a dispatch
//! loop that owns the renderer.
//!
//! ```text
//! Endpoint ──recv──▶ reader task ──NetEvent──┐
//!                                            ├─▶ select! loop ──▶ Renderer
//! keyboard ────────▶ input task ─InputEvent──┘        │
//!                                                     └──send──▶ Endpoint
//! ```
//!
//! When the peer closes and `reconnect_once` is set, the endpoint is
//! reopened on a spawned task that the loop selects on alongside input.

use std::path::PathBuf;
use std::sync::Arc;

use ndog_protocol::{Frame, decode_prefix};
use ndog_transfer::{
    TransferConfig, TransferError, TransferProgress, TransferSummary, receive_file_body,
    send_message,
};
use ndog_transport::{Connection, Endpoint, TransportError};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::command::{ChatCommand, HELP};
use crate::editor::LineEditor;
use crate::hexdump::hex_dump;
use crate::input::InputEvent;
use crate::line::ChatLine;
use crate::renderer::Renderer;
use crate::transcript::Transcript;
use crate::{ChatConfig, ChatError};

/// Largest read the reader task asks for.
const READ_SIZE: usize = 64 * 1024;

/// Why a session ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed `/quit`.
    Quit,
    /// The peer closed the connection (after any reconnect attempt).
    PeerClosed,
    /// Ctrl-C or SIGINT.
    Interrupted,
    /// The input stream ended.
    InputClosed,
}

/// What the reader task reports to the session.
#[derive(Debug)]
enum NetEvent {
    /// A text frame. `bytes` is the raw payload when a hex dump is wanted.
    Text {
        text: String,
        bytes: Option<Vec<u8>>,
    },
    TransferStarted { name: String, size: u64 },
    Progress(TransferProgress),
    TransferFinished(Result<TransferSummary, TransferError>),
    MalformedFrame(String),
    Closed,
    Failed(TransportError),
}

/// An interactive chat over one endpoint.
pub struct ChatSession<R: Renderer> {
    endpoint: Arc<Endpoint>,
    renderer: R,
    config: ChatConfig,
    transfer: TransferConfig,
    editor: LineEditor,
    /// Name of the file being received, if any.
    receiving: Option<String>,
    reconnected: bool,
    transcript: Option<Transcript>,
}

/// A reopen of the endpoint running beside the session loop.
type Reopening = JoinHandle<Result<Endpoint, TransportError>>;

/// What the reader task needs besides the endpoint.
struct ReadOptions {
    download_dir: PathBuf,
    transfer: TransferConfig,
    keep_bytes: bool,
}

impl<R: Renderer> ChatSession<R> {
    pub fn new(endpoint: Endpoint, renderer: R, config: ChatConfig) -> Self {
        Self {
            endpoint: Arc::new(endpoint),
            renderer,
            config: config.validated(),
            transfer: TransferConfig::default(),
            editor: LineEditor::new(),
            receiving: None,
            reconnected: false,
            transcript: None,
        }
    }

    /// Sets how files pushed by the peer are received.
    pub fn transfer_config(mut self, transfer: TransferConfig) -> Self {
        self.transfer = transfer.validated();
        self
    }

    /// Runs until the session ends. The endpoint is closed on every exit.
    ///
    /// A reconnect runs beside the loop, so `/quit` and interrupts still
    /// end the session while it waits for a new peer.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<InputEvent>,
    ) -> Result<SessionEnd, ChatError> {
        if let Err(e) = self.open_transcript() {
            if let Err(close) = self.endpoint.close().await {
                tracing::debug!(error = %close, "closing endpoint failed");
            }
            return Err(e);
        }

        let (events_tx, mut events) = mpsc::channel(self.config.event_capacity);
        let mut reader = self.spawn_reader(events_tx.clone());
        let mut reopening: Option<Reopening> = None;

        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        tracing::info!(
            mode = %self.endpoint.mode(),
            role = %self.endpoint.role(),
            "chat session started"
        );
        let banner = format!(
            "Chat over {} ({}). Type /help for commands.",
            self.endpoint.mode(),
            self.endpoint.role()
        );
        let outcome = match self.system(banner) {
            Err(e) => Err(e),
            Ok(()) => loop {
                let step = tokio::select! {
                    event = events.recv() => match event {
                        Some(NetEvent::Closed) => self.on_closed(&mut reopening).await,
                        Some(event) => self.on_net(event),
                        None => Ok(Some(SessionEnd::PeerClosed)),
                    },
                    joined = wait_reopen(&mut reopening), if reopening.is_some() => {
                        reopening = None;
                        match self.on_reopened(joined) {
                            Ok(true) => {
                                reader = self.spawn_reader(events_tx.clone());
                                Ok(None)
                            }
                            Ok(false) => Ok(Some(SessionEnd::PeerClosed)),
                            Err(e) => Err(e),
                        }
                    }
                    event = input.recv() => match event {
                        Some(event) => self.on_input(event).await,
                        None => Ok(Some(SessionEnd::InputClosed)),
                    },
                    _ = &mut interrupt => Ok(Some(SessionEnd::Interrupted)),
                };
                match step {
                    Ok(None) => continue,
                    Ok(Some(end)) => break Ok(end),
                    Err(e) => break Err(e),
                }
            },
        };

        if let Some(task) = reopening.take() {
            tracing::info!("abandoning reconnect");
            task.abort();
        }
        if let Err(e) = self.endpoint.close().await {
            tracing::debug!(error = %e, "closing endpoint failed");
        }
        // The reader sees the close and winds down; report what it finishes
        // with, such as a cancelled file receive.
        drop(events_tx);
        while let Some(event) = events.recv().await {
            match event {
                NetEvent::Closed | NetEvent::Failed(_) => {}
                event => {
                    if let Err(e) = self.on_net(event) {
                        tracing::debug!(error = %e, "rendering during shutdown failed");
                    }
                }
            }
        }
        if let Err(e) = reader.await {
            tracing::debug!(error = %e, "reader task ended abnormally");
        }

        match &outcome {
            Ok(end) => {
                tracing::info!(?end, "chat session ended");
                let _ = self.system("Session closed.");
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat session failed");
                let _ = self.system(format!("Session failed: {e}"));
            }
        }
        outcome
    }

    fn open_transcript(&mut self) -> Result<(), ChatError> {
        let Some(path) = self.config.transcript.clone() else {
            return Ok(());
        };
        let transcript =
            Transcript::open(&path).map_err(|source| ChatError::Transcript { path, source })?;
        tracing::info!(path = %transcript.path().display(), "writing transcript");
        self.transcript = Some(transcript);
        Ok(())
    }

    fn spawn_reader(&self, tx: mpsc::Sender<NetEvent>) -> JoinHandle<()> {
        let options = ReadOptions {
            download_dir: self.config.download_dir.clone(),
            transfer: self.transfer.clone(),
            keep_bytes: self.config.hex_dump,
        };
        tokio::spawn(read_loop(Arc::clone(&self.endpoint), tx, options))
    }

    /// The peer went away. Starts the single reopen if configured,
    /// otherwise ends the session.
    async fn on_closed(
        &mut self,
        reopening: &mut Option<Reopening>,
    ) -> Result<Option<SessionEnd>, ChatError> {
        if !self.config.reconnect_once || self.reconnected {
            self.system("Peer closed the connection.")?;
            return Ok(Some(SessionEnd::PeerClosed));
        }
        self.reconnected = true;
        self.system("Peer closed the connection. Reconnecting once...")?;
        if let Err(e) = self.endpoint.close().await {
            tracing::debug!(error = %e, "closing endpoint failed");
        }

        let old = Arc::clone(&self.endpoint);
        *reopening = Some(tokio::spawn(async move { old.reopen().await }));
        Ok(None)
    }

    /// Installs the reopened endpoint. `Ok(false)` ends the session.
    fn on_reopened(
        &mut self,
        joined: Result<Result<Endpoint, TransportError>, JoinError>,
    ) -> Result<bool, ChatError> {
        let error = match joined {
            Ok(Ok(endpoint)) => {
                tracing::info!(peer = ?endpoint.peer_addr(), "reconnected");
                self.endpoint = Arc::new(endpoint);
                self.system("Reconnected.")?;
                return Ok(true);
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        tracing::warn!(error = %error, "reconnect failed");
        self.system(format!("Reconnect failed: {error}"))?;
        Ok(false)
    }

    fn on_net(&mut self, event: NetEvent) -> Result<Option<SessionEnd>, ChatError> {
        match event {
            NetEvent::Text { text, bytes } => {
                self.show(&ChatLine::received(&text))?;
                if let Some(bytes) = bytes {
                    let lines = hex_dump(&bytes);
                    self.renderer.dump(&lines)?;
                    self.record(&lines);
                }
                if self.config.notify_sound {
                    self.renderer.notify()?;
                }
            }
            NetEvent::TransferStarted { name, size } => {
                self.system(format!("Receiving file {name} ({size} bytes)"))?;
                self.receiving = Some(name);
            }
            NetEvent::Progress(progress) => {
                if let Some(name) = &self.receiving {
                    self.renderer.progress(name, &progress)?;
                }
            }
            NetEvent::TransferFinished(result) => {
                self.receiving = None;
                match result {
                    Ok(summary) => self.system(format!(
                        "Saved {} to {} ({} bytes)",
                        summary.name,
                        summary.path.display(),
                        summary.progress.total_bytes
                    ))?,
                    Err(e) => {
                        tracing::warn!(error = %e, "file receive failed");
                        self.system(format!("File transfer failed: {e}"))?;
                    }
                }
                self.renderer.input(self.editor.as_str())?;
            }
            NetEvent::MalformedFrame(reason) => {
                self.system(format!("Dropped malformed frame: {reason}"))?;
            }
            NetEvent::Failed(e) => return Err(e.into()),
            // The loop handles this itself; it owns the reopen task.
            NetEvent::Closed => return Ok(Some(SessionEnd::PeerClosed)),
        }
        Ok(None)
    }

    async fn on_input(&mut self, event: InputEvent) -> Result<Option<SessionEnd>, ChatError> {
        match event {
            InputEvent::Char(c) => {
                self.editor.push(c);
                self.renderer.input(self.editor.as_str())?;
            }
            InputEvent::Backspace => {
                if self.editor.backspace() {
                    self.renderer.input(self.editor.as_str())?;
                }
            }
            InputEvent::Enter => {
                let line = self.editor.submit();
                self.renderer.input("")?;
                return self.submit(&line).await;
            }
            InputEvent::Line(line) => return self.submit(&line).await,
            InputEvent::Interrupt => return Ok(Some(SessionEnd::Interrupted)),
            InputEvent::Eof => return Ok(Some(SessionEnd::InputClosed)),
        }
        Ok(None)
    }

    async fn submit(&mut self, line: &str) -> Result<Option<SessionEnd>, ChatError> {
        let Some(command) = ChatCommand::parse(line) else {
            return Ok(None);
        };
        match command {
            ChatCommand::Help => {
                self.system("Commands:")?;
                for (name, description) in HELP {
                    self.system(format!("  {name:<8} {description}"))?;
                }
            }
            ChatCommand::Clear => self.renderer.clear()?,
            ChatCommand::Quit => return Ok(Some(SessionEnd::Quit)),
            ChatCommand::Status => {
                let peer = self
                    .endpoint
                    .peer_addr()
                    .map_or_else(|| "no peer yet".to_string(), |addr| addr.to_string());
                self.system(format!(
                    "{} {}, peer {peer}",
                    self.endpoint.mode(),
                    self.endpoint.role()
                ))?;
            }
            ChatCommand::WhoAmI => {
                self.system(format!("Your address: {}", self.endpoint.local_addr()))?;
            }
            ChatCommand::Send(text) => self.send(text).await?,
        }
        Ok(None)
    }

    async fn send(&mut self, text: String) -> Result<(), ChatError> {
        match send_message(self.endpoint.as_ref(), &text).await {
            Ok(()) => self.show(&ChatLine::sent(text))?,
            Err(TransferError::Transport(TransportError::NoPeer)) => {
                self.system("No peer yet: wait for the first message before replying.")?;
            }
            Err(TransferError::Transport(TransportError::Shutdown)) => {
                self.system("Not connected: waiting for the peer to come back.")?;
            }
            Err(e @ TransferError::PayloadTooLarge { .. }) => {
                tracing::warn!(error = %e, "message not sent");
                self.system(format!("Not sent: {e}"))?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn system(&mut self, text: impl Into<String>) -> Result<(), ChatError> {
        self.show(&ChatLine::system(text))
    }

    fn show(&mut self, line: &ChatLine) -> Result<(), ChatError> {
        self.renderer.line(line)?;
        self.record(&[line.to_string()]);
        Ok(())
    }

    /// Copies `lines` to the transcript. A failed write stops the
    /// transcript but not the session.
    fn record(&mut self, lines: &[String]) {
        let Some(transcript) = self.transcript.as_mut() else {
            return;
        };
        for line in lines {
            if let Err(e) = transcript.write_line(line) {
                tracing::warn!(
                    path = %transcript.path().display(),
                    error = %e,
                    "transcript write failed, no longer recording"
                );
                self.transcript = None;
                return;
            }
        }
    }
}

/// Resolves when the reopen finishes. Pending forever if none is running.
async fn wait_reopen(
    task: &mut Option<Reopening>,
) -> Result<Result<Endpoint, TransportError>, JoinError> {
    match task.as_mut() {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

/// Reads frames until the endpoint closes. A file header switches to body
/// mode until the declared size has been written.
async fn read_loop(endpoint: Arc<Endpoint>, tx: mpsc::Sender<NetEvent>, options: ReadOptions) {
    loop {
        let inbound = match endpoint.recv(READ_SIZE).await {
            Ok(Some(inbound)) => inbound,
            Ok(None) => {
                let _ = tx.send(NetEvent::Closed).await;
                return;
            }
            Err(e) => {
                let _ = tx.send(NetEvent::Failed(e)).await;
                return;
            }
        };

        let event = match decode_prefix(&inbound.bytes) {
            Ok((Frame::Message(text) | Frame::RawText(text), _)) => NetEvent::Text {
                text,
                bytes: options.keep_bytes.then(|| inbound.bytes.clone()),
            },
            Ok((Frame::FileHeader { name, size }, body)) => {
                let started = NetEvent::TransferStarted {
                    name: name.clone(),
                    size,
                };
                if tx.send(started).await.is_err() {
                    return;
                }
                let result = match tokio::fs::create_dir_all(&options.download_dir).await {
                    Ok(()) => {
                        receive_file_body(
                            endpoint.as_ref(),
                            &name,
                            size,
                            body,
                            &options.download_dir,
                            &options.transfer,
                            |progress| {
                                // Progress is best effort; a full channel skips an update.
                                let _ = tx.try_send(NetEvent::Progress(*progress));
                            },
                        )
                        .await
                    }
                    Err(source) => Err(TransferError::NotWritable {
                        path: options.download_dir.clone(),
                        source,
                    }),
                };
                NetEvent::TransferFinished(result)
            }
            Err(e) => {
                tracing::warn!(from = %inbound.from, error = %e, "malformed frame");
                NetEvent::MalformedFrame(e.to_string())
            }
        };
        if tx.send(event).await.is_err() {
            return;
        }
    }
}
