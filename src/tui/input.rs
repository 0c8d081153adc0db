//! Key handling and slash commands

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use unicode_width::UnicodeWidthStr;

/// What the UI should do in response to a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a line to the runtime
    Submit(String),
    Reset,
    CheckHealth,
    Forget,
    Quit,
    /// Local feedback that never reaches the runtime
    Unknown(String),
    /// Key consumed (or ignored) with nothing further to do
    None,
}

/// The editable input line
#[derive(Debug, Default)]
pub struct InputBuffer {
    text: String,
}

impl InputBuffer {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Display width of the line in terminal columns
    pub fn width(&self) -> usize {
        self.text.width()
    }

    fn push(&mut self, c: char) {
        self.text.push(c);
    }

    fn backspace(&mut self) {
        self.text.pop();
    }

    fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    /// Map a key press to an action, editing the buffer as needed.
    ///
    /// While a reply is pending only reset and quit keys do anything.
    pub fn handle_key(&mut self, key: KeyEvent, pending: bool) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('c')) {
            return Action::Quit;
        }
        if ctrl && key.code == KeyCode::Char('l') {
            return Action::Reset;
        }

        if pending {
            return Action::None;
        }

        match key.code {
            KeyCode::Enter => parse_line(self.take()),
            KeyCode::Backspace => {
                self.backspace();
                Action::None
            }
            KeyCode::Char(c) if !ctrl => {
                self.push(c);
                Action::None
            }
            _ => Action::None,
        }
    }
}

/// Interpret a submitted line: slash commands, otherwise a chat message.
/// A leading `//` sends the rest with a single literal slash. Blank lines are
/// still submitted; the runtime ignores them.
pub fn parse_line(line: String) -> Action {
    let command = line.trim();
    if command.starts_with("//") {
        return Action::Submit(line.replacen('/', "", 1));
    }
    if !command.starts_with('/') {
        return Action::Submit(line);
    }
    match command {
        "/clear" => Action::Reset,
        "/health" => Action::CheckHealth,
        "/forget" => Action::Forget,
        "/quit" | "/exit" => Action::Quit,
        other => Action::Unknown(format!(
            "Unknown command {other} (try /clear, /health, /forget, /quit; start with // to send a slash)"
        )),
    }
}
