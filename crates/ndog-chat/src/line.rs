//! Rendered chat lines.

use std::fmt;

use chrono::{DateTime, Local};

/// Who a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
    System,
}

impl Direction {
    /// The tag shown after the timestamp.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Sent => "[YOU]",
            Self::Received => "[RECV]",
            Self::System => "[*]",
        }
    }
}

/// One line of chat history, only used for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub timestamp: DateTime<Local>,
    pub direction: Direction,
    pub text: String,
}

impl ChatLine {
    pub fn new(direction: Direction, text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            direction,
            text: text.into(),
        }
    }

    pub fn sent(text: impl Into<String>) -> Self {
        Self::new(Direction::Sent, text)
    }

    /// A line from the peer, with its trailing line break removed.
    pub fn received(text: &str) -> Self {
        Self::new(Direction::Received, text.trim_end_matches(['\r', '\n']))
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Direction::System, text)
    }
}

/// `HH:MM:SS` of the given time.
pub fn clock(time: &DateTime<Local>) -> impl fmt::Display + '_ {
    time.format("%H:%M:%S")
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            clock(&self.timestamp),
            self.direction.tag(),
            self.text
        )
    }
}
