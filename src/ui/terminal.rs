//! Terminal front-end
//!
//! Renders elements as coloured lines and turns typed input into button
//! clicks. Stdin is read on a dedicated thread so a pending read never holds
//! the async runtime open at exit.

use std::io::{self, BufRead, Write};
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Alert, CommandButton, Element, Rgb};

/// Capacity of the click channel between the input thread and the controller
const CLICK_CHANNEL_CAPACITY: usize = 64;

/// An element rendered as one terminal line per text update
///
/// Colour changes are remembered and applied to the next line written.
pub struct TerminalElement<W: Write> {
    name: String,
    out: W,
    background: Option<Rgb>,
}

impl TerminalElement<io::Stdout> {
    /// Element writing to standard output
    pub fn stdout(name: impl Into<String>) -> Self {
        Self::new(name, io::stdout())
    }
}

impl<W: Write> TerminalElement<W> {
    pub fn new(name: impl Into<String>, out: W) -> Self {
        Self {
            name: name.into(),
            out,
            background: None,
        }
    }

    /// Format a line for this element
    pub fn render(&self, text: &str) -> String {
        match self.background {
            Some(Rgb { r, g, b }) => format!(
                "\x1b[48;2;{};{};{}m\x1b[30m[{}] {}\x1b[0m",
                r, g, b, self.name, text
            ),
            None => format!("[{}] {}", self.name, text),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Element for TerminalElement<W> {
    fn set_background_color(&mut self, color: Rgb) {
        self.background = Some(color);
    }

    fn set_text(&mut self, text: &str) {
        let line = self.render(text);
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to render {}: {}", self.name, e);
        }
    }
}

/// Alert written as an `Error:` line, standard error by default
pub struct TerminalAlert<W: Write> {
    out: W,
}

impl TerminalAlert<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> TerminalAlert<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Alert for TerminalAlert<W> {
    fn alert(&mut self, message: &str) {
        if let Err(e) = writeln!(self.out, "Error: {}", message).and_then(|_| self.out.flush()) {
            warn!("Failed to show alert '{}': {}", message, e);
        }
    }
}

/// What a line of typed input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Click the button with this element id
    Click(String),
    /// Show the list of buttons
    Help,
    /// Nothing typed
    Empty,
    /// Input matched no button
    Unknown(String),
}

/// The set of command buttons on the page
#[derive(Debug, Clone, Default)]
pub struct ButtonPanel {
    buttons: Vec<CommandButton>,
}

impl ButtonPanel {
    pub fn new(buttons: Vec<CommandButton>) -> Self {
        Self { buttons }
    }

    /// First button that matches the input
    pub fn resolve(&self, input: &str) -> Option<&CommandButton> {
        self.buttons.iter().find(|button| button.matches(input))
    }

    /// Interpret one line of input
    pub fn interpret(&self, line: &str) -> InputAction {
        let input = line.trim();
        match input {
            "" => InputAction::Empty,
            "help" | "?" => InputAction::Help,
            _ => match self.resolve(input) {
                Some(button) => InputAction::Click(button.id.clone()),
                None => InputAction::Unknown(input.to_string()),
            },
        }
    }

    /// Listing of every button with its shortcut
    pub fn help_text(&self) -> String {
        if self.buttons.is_empty() {
            return "No command buttons configured".to_string();
        }

        let mut text = String::from("Command buttons (type a key, id or label):");
        for button in &self.buttons {
            let key = button
                .key
                .map(|k| format!("({})", k))
                .unwrap_or_else(|| "   ".to_string());
            text.push_str(&format!("\n {:<4} {:<20} {}", key, button.display_label(), button.id));
        }
        text
    }

    /// Start reading clicks from standard input
    ///
    /// The returned receiver yields element ids and closes when stdin ends.
    pub fn spawn_stdin(self) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(CLICK_CHANNEL_CAPACITY);

        thread::spawn(move || {
            let stdin = io::stdin();
            self.feed(stdin.lock(), &tx);
            debug!("Input closed");
        });

        rx
    }

    /// Forward every clicked button id from `input` to `tx`
    fn feed<R: BufRead>(&self, input: R, tx: &mpsc::Sender<String>) {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            };

            match self.interpret(&line) {
                InputAction::Click(id) => {
                    if tx.blocking_send(id).is_err() {
                        break;
                    }
                }
                InputAction::Help => println!("{}", self.help_text()),
                InputAction::Empty => {}
                InputAction::Unknown(input) => {
                    warn!("No command button matches '{}' (type 'help' for a list)", input)
                }
            }
        }
    }
}
