//! Roster CLI library
//!
//! Argument definitions and command implementations for the `roster`
//! binary. Commands work on an [`Auth`](roster_sync::Auth) session over any
//! identity provider so they can be exercised without touching disk.

#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
