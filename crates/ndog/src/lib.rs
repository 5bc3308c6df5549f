//! # ndog
//!
//! Point-to-point network utility: send or receive a text message, send or
//! receive a file, or hold an interactive chat, over one TCP connection or
//! one UDP socket pair.
//!
//! The work is split across layered crates, re-exported here:
//!
//! - [`transport`]: the [`Endpoint`](transport::Endpoint) for one TCP
//!   stream or UDP socket.
//! - [`protocol`]: the `MSG:` / `FILE:` wire framing.
//! - [`transfer`]: message and chunked file engines.
//! - [`chat`]: the interactive session.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ndog::prelude::*;
//!
//! # async fn demo() -> Result<(), NdogError> {
//! ndog::init_tracing(false);
//! let outcome = NdogBuilder::new()
//!     .listen()
//!     .port(5555)
//!     .run(Operation::ReceiveFile(".".into()))
//!     .await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod progress;
mod runner;

pub use config::NdogConfig;
pub use error::{ErrorKind, NdogError};
pub use runner::{NdogBuilder, Operation, Outcome, execute, execute_with_cancel};

pub use ndog_chat as chat;
pub use ndog_protocol as protocol;
pub use ndog_transfer as transfer;
pub use ndog_transport as transport;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise the level is `warn`, or `debug`
/// when `verbose`. Calling this twice is harmless.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Everything a front end usually needs.
pub mod prelude {
    pub use crate::{ErrorKind, NdogBuilder, NdogConfig, NdogError, Operation, Outcome};
    pub use ndog_chat::{ChatConfig, SessionEnd};
    pub use ndog_transfer::{TransferConfig, TransferProgress, TransferSummary};
    pub use ndog_transport::{Role, TransportConfig, TransportMode};
}
