//! Interactive chat for ndog.
//!
//! A [`ChatSession`] runs over one [`Endpoint`]. Lines typed locally are
//! checked against a few slash commands and otherwise sent as message
//! frames. Lines from the peer are rendered with a timestamp, and a file
//! header from the peer starts a file receive into the download
//! directory.
//!
//! - **Session** ([`ChatSession`], [`SessionEnd`]): the dispatch loop.
//! - **Input** ([`spawn_input`], [`InputEvent`], [`LineEditor`]): raw
//!   keys on a terminal, whole lines when piped.
//! - **Output** ([`Renderer`], [`TerminalRenderer`], [`ChatLine`]), with
//!   an optional [`hex_dump`] of received payloads and a plain-text
//!   [`Transcript`].

mod command;
mod config;
mod editor;
mod error;
mod hexdump;
mod input;
mod line;
mod renderer;
mod session;
mod transcript;

pub use command::{ChatCommand, HELP};
pub use config::ChatConfig;
pub use editor::LineEditor;
pub use error::ChatError;
pub use hexdump::hex_dump;
pub use input::{InputEvent, InputHandle, is_interactive, spawn_input};
pub use line::{ChatLine, Direction};
pub use renderer::{Renderer, TerminalRenderer};
pub use session::{ChatSession, SessionEnd};
pub use transcript::{Transcript, strip_ansi};

use std::io::IsTerminal;

use ndog_transfer::TransferConfig;
use ndog_transport::Endpoint;

/// Runs a chat on the process terminal until it ends.
pub async fn run_terminal(
    endpoint: Endpoint,
    config: ChatConfig,
    transfer: TransferConfig,
) -> Result<SessionEnd, ChatError> {
    let config = config.validated();
    let (input, _handle) = spawn_input(config.input_capacity)?;
    let colorize = std::io::stdout().is_terminal();
    let renderer = TerminalRenderer::stdout(colorize, is_interactive());
    ChatSession::new(endpoint, renderer, config)
        .transfer_config(transfer)
        .run(input)
        .await
}
