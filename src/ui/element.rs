//! Display elements
//!
//! `StatusIndicator` reflects the connection phase, `MessageDisplay` shows the
//! last payload received. Both write through the [`Element`] trait.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status text shown once the connection is open
pub const OPENED_TEXT: &str = "websocket connection opened";

/// Status text shown once the connection has closed
pub const CLOSED_TEXT: &str = "websocket connection CLOSED";

/// Error returned when a colour string is not `#rrggbb`
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid colour '{0}', expected #rrggbb")]
pub struct ColorError(String);

/// A 24-bit colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Bright green used for an open connection
    pub const OPEN_GREEN: Rgb = Rgb::new(0x40, 0xff, 0x40);
    /// Bright red used for a closed connection
    pub const CLOSED_RED: Rgb = Rgb::new(0xff, 0x40, 0x40);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6 && hex.is_ascii())
            .ok_or_else(|| ColorError(s.to_string()))?;

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ColorError(s.to_string()))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A surface with a settable background colour and text content
pub trait Element {
    fn set_background_color(&mut self, color: Rgb);
    fn set_text(&mut self, text: &str);
}

/// Blocking notification shown to the user on fatal errors
pub trait Alert {
    fn alert(&mut self, message: &str);
}

/// Background colours used by the status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPalette {
    /// Background while the connection is open
    #[serde(default = "default_open_color")]
    pub open: Rgb,
    /// Background once the connection has closed
    #[serde(default = "default_closed_color")]
    pub closed: Rgb,
}

fn default_open_color() -> Rgb {
    Rgb::OPEN_GREEN
}

fn default_closed_color() -> Rgb {
    Rgb::CLOSED_RED
}

impl Default for StatusPalette {
    fn default() -> Self {
        Self {
            open: Rgb::OPEN_GREEN,
            closed: Rgb::CLOSED_RED,
        }
    }
}

/// Shows whether the connection is open or closed
///
/// There is no visual state for "connecting": the element is left untouched
/// until the first lifecycle event arrives.
#[derive(Debug)]
pub struct StatusIndicator<E> {
    element: E,
    palette: StatusPalette,
}

impl<E: Element> StatusIndicator<E> {
    pub fn new(element: E) -> Self {
        Self {
            element,
            palette: StatusPalette::default(),
        }
    }

    pub fn with_palette(mut self, palette: StatusPalette) -> Self {
        self.palette = palette;
        self
    }

    pub fn show_open(&mut self) {
        self.element.set_background_color(self.palette.open);
        self.element.set_text(OPENED_TEXT);
    }

    pub fn show_closed(&mut self) {
        self.element.set_background_color(self.palette.closed);
        self.element.set_text(CLOSED_TEXT);
    }

    #[cfg(test)]
    pub fn element(&self) -> &E {
        &self.element
    }
}

/// Shows the payload of the most recent message, replacing the previous one
#[derive(Debug)]
pub struct MessageDisplay<E> {
    element: E,
}

impl<E: Element> MessageDisplay<E> {
    pub fn new(element: E) -> Self {
        Self { element }
    }

    pub fn show(&mut self, text: &str) {
        self.element.set_text(text);
    }

    #[cfg(test)]
    pub fn element(&self) -> &E {
        &self.element
    }
}
