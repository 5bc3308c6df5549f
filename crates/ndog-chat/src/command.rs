//! Slash commands typed into the chat prompt.

/// What a submitted line asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Clear,
    Quit,
    Status,
    WhoAmI,
    /// Anything else, including unknown `/words`, goes to the peer.
    Send(String),
}

/// `(command, description)` pairs shown by `/help`.
pub const HELP: &[(&str, &str)] = &[
    ("/help", "show this help"),
    ("/clear", "clear the screen"),
    ("/quit", "end the session"),
    ("/status", "show mode, role and peer"),
    ("/whoami", "show your local address"),
];

impl ChatCommand {
    /// Parses a submitted line. Commands are case-insensitive; an empty
    /// line is `None`.
    pub fn parse(line: &str) -> Option<Self> {
        if line.is_empty() {
            return None;
        }
        let command = match line.trim().to_ascii_lowercase().as_str() {
            "/help" => Self::Help,
            "/clear" => Self::Clear,
            "/quit" => Self::Quit,
            "/status" => Self::Status,
            "/whoami" => Self::WhoAmI,
            _ => Self::Send(line.to_string()),
        };
        Some(command)
    }
}
