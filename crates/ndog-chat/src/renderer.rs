//! Drawing chat output.

use std::io::{self, Write};

use crossterm::cursor::{MoveTo, MoveToColumn};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::queue;
use ndog_transfer::TransferProgress;

use crate::hexdump::{OFFSET_WIDTH, TEXT_COLUMN};
use crate::line::{ChatLine, Direction, clock};

/// Where the session draws. Owned exclusively by the session loop.
pub trait Renderer: Send {
    /// Prints one finished line.
    fn line(&mut self, line: &ChatLine) -> io::Result<()>;

    /// Redraws the prompt with the line being typed.
    fn input(&mut self, _pending: &str) -> io::Result<()> {
        Ok(())
    }

    /// Shows how far an incoming file has got.
    fn progress(&mut self, _name: &str, _progress: &TransferProgress) -> io::Result<()> {
        Ok(())
    }

    /// Clears the visible screen.
    fn clear(&mut self) -> io::Result<()>;

    /// Alerts the user that a line arrived.
    fn notify(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Prints hex dump lines under a received line.
    fn dump(&mut self, _lines: &[String]) -> io::Result<()> {
        Ok(())
    }
}

/// Renders to a terminal (or any writer) with optional colour.
///
/// In interactive mode the prompt `[HH:MM:SS] [YOU] <pending>` stays on the
/// last row and is redrawn under every printed line.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    colorize: bool,
    interactive: bool,
    pending: String,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout(colorize: bool, interactive: bool) -> Self {
        Self::new(io::stdout(), colorize, interactive)
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W, colorize: bool, interactive: bool) -> Self {
        Self {
            out,
            colorize,
            interactive,
            pending: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn newline(&self) -> &'static str {
        // Raw mode does not translate `\n`.
        if self.interactive { "\r\n" } else { "\n" }
    }

    fn styled(&mut self, color: Color, text: &str) -> io::Result<()> {
        if self.colorize {
            queue!(self.out, SetForegroundColor(color), Print(text), ResetColor)
        } else {
            queue!(self.out, Print(text))
        }
    }

    fn erase_prompt(&mut self) -> io::Result<()> {
        if self.interactive {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        }
        Ok(())
    }

    fn draw_prompt(&mut self) -> io::Result<()> {
        if self.interactive {
            let prompt = format!("[{}] [YOU] ", clock(&chrono::Local::now()));
            self.styled(Color::Blue, &prompt)?;
            let pending = self.pending.as_str();
            queue!(self.out, Print(pending))?;
        }
        self.out.flush()
    }
}

fn color_of(direction: Direction) -> Color {
    match direction {
        Direction::Sent => Color::Blue,
        Direction::Received => Color::Cyan,
        Direction::System => Color::Yellow,
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn line(&mut self, line: &ChatLine) -> io::Result<()> {
        self.erase_prompt()?;
        let newline = self.newline();
        self.styled(color_of(line.direction), &line.to_string())?;
        queue!(self.out, Print(newline))?;
        self.draw_prompt()
    }

    fn input(&mut self, pending: &str) -> io::Result<()> {
        self.pending.clear();
        self.pending.push_str(pending);
        self.erase_prompt()?;
        self.draw_prompt()
    }

    fn progress(&mut self, name: &str, progress: &TransferProgress) -> io::Result<()> {
        if self.interactive {
            self.erase_prompt()?;
            self.styled(Color::Yellow, &format!("[*] {name}: {progress}"))?;
            return self.out.flush();
        }
        // Piped output gets the final figure only.
        if progress.is_complete() {
            let newline = self.newline();
            self.styled(Color::Yellow, &format!("[*] {name}: {progress}"))?;
            queue!(self.out, Print(newline))?;
        }
        self.out.flush()
    }

    fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.draw_prompt()
    }

    fn notify(&mut self) -> io::Result<()> {
        self.out.write_all(b"\x07")?;
        self.out.flush()
    }

    fn dump(&mut self, lines: &[String]) -> io::Result<()> {
        self.erase_prompt()?;
        let newline = self.newline();
        for line in lines {
            let columns = (
                line.get(..OFFSET_WIDTH),
                line.get(OFFSET_WIDTH..TEXT_COLUMN),
                line.get(TEXT_COLUMN..),
            );
            match columns {
                (Some(offset), Some(hex), Some(ascii)) => {
                    self.styled(Color::Cyan, offset)?;
                    queue!(self.out, Print(hex))?;
                    self.styled(Color::Green, ascii)?;
                }
                _ => queue!(self.out, Print(line))?,
            }
            queue!(self.out, Print(newline))?;
        }
        self.draw_prompt()
    }
}
