//! Page location module
//!
//! Describes where the remote-control page is served from and derives the
//! websocket endpoint that belongs to it.

mod location;

pub use location::*;
