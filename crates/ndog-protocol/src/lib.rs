//! Wire protocol for ndog.
//!
//! This crate defines the frames peers exchange and how they look on
//! the wire:
//!
//! - **Frames** ([`Frame`], [`FrameKind`]): message, file header, or
//!   legacy raw text.
//! - **Codec** ([`encode_message`], [`encode_file_header`], [`decode`],
//!   [`decode_prefix`]): the `MSG:` / `FILE:` prefix format.
//! - **Errors** ([`ProtocolError`]): what can go wrong decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the engines.
//! It does not know about sockets or files.
//!
//! ```text
//! Transport (bytes) → Protocol (Frame) → Message / File / Chat engines
//! ```

mod codec;
mod error;
mod frame;

pub use codec::{
    FILE_PREFIX, MESSAGE_PREFIX, decode, decode_prefix, encode_file_header, encode_message,
};
pub use error::ProtocolError;
pub use frame::{Frame, FrameKind, sanitize_file_name};
