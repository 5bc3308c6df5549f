//! Transfer engines for ndog.
//!
//! - **Messages** ([`send_message`], [`receive_message`]): one text frame
//!   per write or datagram.
//! - **Files** ([`send_file`], [`receive_file`], [`receive_file_body`]):
//!   a `FILE:` header, then the body in chunks with byte-level progress.
//!
//! Engines are generic over [`ndog_transport::Connection`], so they run
//! the same over TCP, UDP, or an in-memory test connection.

mod config;
mod error;
mod file;
mod message;
mod progress;

#[cfg(test)]
mod testing;

pub use config::TransferConfig;
pub use error::{FailureCause, TransferError};
pub use file::{receive_file, receive_file_body, send_file};
pub use message::{ReceivedMessage, receive_message, send_message};
pub use progress::{TransferProgress, TransferSummary};
