//! Chat session configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for one chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Where files the peer sends mid-chat are saved. Default: `.`.
    pub download_dir: PathBuf,

    /// Re-open the endpoint once when the peer closes. Default: `false`.
    pub reconnect_once: bool,

    /// Buffered input events between the input task and the session.
    pub input_capacity: usize,

    /// Buffered network events between the reader task and the session.
    pub event_capacity: usize,

    /// Ring the terminal bell on every received line. Default: `true`.
    pub notify_sound: bool,

    /// Also show each received payload as a hex dump. Default: `false`.
    pub hex_dump: bool,

    /// Append every rendered line, without colour, to this file.
    pub transcript: Option<PathBuf>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("."),
            reconnect_once: false,
            input_capacity: 64,
            event_capacity: 64,
            notify_sound: true,
            hex_dump: false,
            transcript: None,
        }
    }
}

impl ChatConfig {
    /// Clamps channel capacities to at least 1.
    pub fn validated(mut self) -> Self {
        if self.input_capacity == 0 {
            tracing::warn!("input_capacity of 0 is invalid, using 1");
            self.input_capacity = 1;
        }
        if self.event_capacity == 0 {
            tracing::warn!("event_capacity of 0 is invalid, using 1");
            self.event_capacity = 1;
        }
        self
    }
}
