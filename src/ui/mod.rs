//! UI surfaces module
//!
//! The controller only needs elements with a settable background colour and
//! text, a way to alert the user, and command buttons with identifiers. The
//! terminal front-end provides concrete implementations of all three.

mod command;
mod element;
mod terminal;

pub use command::*;
pub use element::*;
pub use terminal::*;
