//! Command buttons
//!
//! A button's identifier doubles as its command: `nextMaskButton` sends
//! `nextMask`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Suffix carried by command button identifiers
pub const BUTTON_SUFFIX: &str = "Button";

/// Text token sent over the connection when a button is clicked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    /// Derive a command from an element id by removing one trailing `Button`
    pub fn from_element_id(id: &str) -> Self {
        Self(id.strip_suffix(BUTTON_SUFFIX).unwrap_or(id).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A clickable element that sends a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandButton {
    /// Element identifier, expected to end with `Button`
    pub id: String,
    /// Human readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Single-key shortcut
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<char>,
}

impl CommandButton {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            key: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_key(mut self, key: char) -> Self {
        self.key = Some(key);
        self
    }

    /// Command sent when this button is clicked
    pub fn command(&self) -> Command {
        Command::from_element_id(&self.id)
    }

    /// Label if set, otherwise the command text
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.command().into_string())
    }

    /// Whether typed input refers to this button
    ///
    /// Matches the id, the command, the label (case-insensitive) or the
    /// shortcut key.
    pub fn matches(&self, input: &str) -> bool {
        if input == self.id || input == self.command().as_str() {
            return true;
        }

        if let Some(label) = &self.label {
            if label.eq_ignore_ascii_case(input) {
                return true;
            }
        }

        let mut chars = input.chars();
        match (self.key, chars.next(), chars.next()) {
            (Some(key), Some(c), None) => key == c,
            _ => false,
        }
    }
}
