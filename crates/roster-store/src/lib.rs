//! Roster Store - Directory Layout
//!
//! ```text
//! <stores>/<operator>/.roster                          marker, written last on creation
//! <stores>/<operator>/<operator>.jwt
//! <stores>/<operator>/accounts/<account>/<account>.jwt
//! <stores>/<operator>/accounts/<account>/users/<user>.jwt
//! <keys>/<operator>/<PUBLIC KEY>.nk                    seed, mode 0600
//! ```
//!
//! Directories are created owner-only (0700). Every file is written to a
//! temporary sibling and renamed into place.

#![forbid(unsafe_code)]

mod fs_util;

/// Claim store
pub mod filesystem;

/// Key vaults
pub mod vault;

pub use filesystem::{DirectoryStore, OperatorMarker, MARKER_FILE};
pub use vault::{DirectoryKeyVault, DirectoryKeyVaults, KEY_EXTENSION};
