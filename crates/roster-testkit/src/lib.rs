//! Roster Testing Infrastructure
//!
//! In-memory doubles for the store and key vaults, tree fixtures and
//! proptest strategies shared by the roster crates' tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust,no_run
//! use roster_testkit::{fixtures, MemoryKeyVaults, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let vaults = MemoryKeyVaults::new();
//! let operator = fixtures::operator_with("O", &[("A", &["U"])]);
//! // hand store/vaults to a provider, store `operator`, count writes...
//! ```

pub mod fixtures;
pub mod memory_store;
pub mod memory_vault;
pub mod strategies;

pub use memory_store::MemoryStore;
pub use memory_vault::{MemoryKeyVault, MemoryKeyVaults};
