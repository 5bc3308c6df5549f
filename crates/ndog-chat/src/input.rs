//! Keyboard input for the chat prompt.
//!
//! On a terminal, raw mode is enabled and keys arrive one at a time so the
//! session can edit the pending line. When stdin is piped, whole lines are
//! read instead.

use std::io::IsTerminal;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One unit of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Char(char),
    Backspace,
    Enter,
    /// A whole line, from piped input.
    Line(String),
    /// Ctrl-C in raw mode.
    Interrupt,
    /// Ctrl-D, or the input stream ended.
    Eof,
}

/// Keeps the input task alive. Dropping it stops the task and restores
/// the terminal.
pub struct InputHandle {
    task: JoinHandle<()>,
    _raw_mode: Option<RawModeGuard>,
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> std::io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            tracing::debug!(error = %e, "failed to restore terminal mode");
        }
    }
}

/// Whether keys arrive one at a time (a terminal) or as lines.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

/// Starts reading stdin on a background task.
pub fn spawn_input(
    capacity: usize,
) -> std::io::Result<(mpsc::Receiver<InputEvent>, InputHandle)> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = if is_interactive() {
        let guard = RawModeGuard::enable()?;
        InputHandle {
            task: tokio::spawn(read_keys(tx)),
            _raw_mode: Some(guard),
        }
    } else {
        InputHandle {
            task: tokio::spawn(read_lines(tx)),
            _raw_mode: None,
        }
    };
    Ok((rx, handle))
}

async fn read_keys(tx: mpsc::Sender<InputEvent>) {
    let mut events = EventStream::new();
    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "terminal input failed");
                break;
            }
        };
        let Event::Key(key) = event else {
            continue;
        };
        let Some(input) = map_key(key) else {
            continue;
        };
        let last = matches!(input, InputEvent::Interrupt | InputEvent::Eof);
        if tx.send(input).await.is_err() || last {
            return;
        }
    }
    let _ = tx.send(InputEvent::Eof).await;
}

async fn read_lines(tx: mpsc::Sender<InputEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(InputEvent::Line(line)).await.is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "reading stdin failed");
                break;
            }
        }
    }
    let _ = tx.send(InputEvent::Eof).await;
}

/// Translates a key press into input. Releases and unbound keys are `None`.
pub(crate) fn map_key(key: KeyEvent) -> Option<InputEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Some(InputEvent::Interrupt),
        KeyCode::Char('d') if ctrl => Some(InputEvent::Eof),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => Some(InputEvent::Char(c)),
        KeyCode::Backspace => Some(InputEvent::Backspace),
        KeyCode::Enter => Some(InputEvent::Enter),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_key() {
        let plain = |code| KeyEvent::new(code, KeyModifiers::NONE);
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);

        assert_eq!(map_key(plain(KeyCode::Char('a'))), Some(InputEvent::Char('a')));
        assert_eq!(map_key(plain(KeyCode::Backspace)), Some(InputEvent::Backspace));
        assert_eq!(map_key(plain(KeyCode::Enter)), Some(InputEvent::Enter));
        assert_eq!(map_key(ctrl('c')), Some(InputEvent::Interrupt));
        assert_eq!(map_key(ctrl('d')), Some(InputEvent::Eof));
        assert_eq!(map_key(ctrl('x')), None);
        assert_eq!(map_key(plain(KeyCode::F(1))), None);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(map_key(key), None);
    }
}
