//! Roster Sync - Load/Store Engine
//!
//! Reconstructs the operator → account → user tree from a [`StoreBackend`]
//! and its per-operator [`KeyVault`]s, and writes a mutated tree back with
//! the smallest set of writes: changed claims, journaled key additions and
//! removals, and pending deletions.
//!
//! [`StoreBackend`]: roster_core::StoreBackend
//! [`KeyVault`]: roster_core::KeyVault

#![forbid(unsafe_code)]

/// Session facade over a provider
pub mod auth;

/// Tree reconstruction
pub mod loader;

/// Provider binding the engine to its collaborators
pub mod provider;

/// Change write-back
pub mod synchronizer;

pub use auth::Auth;
pub use loader::Loader;
pub use provider::{DirectoryProvider, Provider};
pub use synchronizer::{StoreSummary, Synchronizer};
