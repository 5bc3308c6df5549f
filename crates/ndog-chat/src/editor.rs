//! In-progress input line.

/// Buffers typed characters until the line is submitted.
#[derive(Debug, Default, Clone)]
pub struct LineEditor {
    buffer: String,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a printable character. Control characters are ignored.
    pub fn push(&mut self, c: char) {
        if !c.is_control() {
            self.buffer.push(c);
        }
    }

    /// Erases the last character. Returns `false` if the line was empty.
    pub fn backspace(&mut self) -> bool {
        self.buffer.pop().is_some()
    }

    /// Takes the finished line, leaving the editor empty.
    pub fn submit(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
