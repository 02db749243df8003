//! Configuration module
//!
//! Loads the remote-control layout: the page to connect to, the status
//! colours and the command buttons.

mod layout;

pub use layout::*;
