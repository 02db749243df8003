//! Connection module
//!
//! Owns the single websocket connection of the remote control: opening it
//! through a socket factory, tracking its lifecycle and routing events to the
//! display surfaces.

mod controller;
mod socket;

pub use controller::*;
pub use socket::*;
