//! Roster Core - Identity Tree Model
//!
//! Types shared by every roster crate: the operator → account → user tree,
//! the signed claims each node carries, Ed25519 key pairs, the JWT claim
//! codec, and the interfaces the load/store engine consumes.
//!
//! # Layers
//!
//! ## Identity material
//! - `KeyPair`: role-prefixed Ed25519 key (`O`, `A`, `U`)
//! - `Claims<T>`: signed payload with `sub`, `iss`, `iat` and type fields
//! - `JwtCodec`: `header.payload.signature` encoding with issuer verification
//!
//! ## Tree
//! - `OperatorNode` owns `AccountNode`s, which own `UserNode`s
//! - `KeyJournal`: pending vault additions/removals per operator
//! - `Tracked`: `loaded_at` / `issued_at` dirty detection
//!
//! ## Interfaces
//! - `StoreBackend`, `KeyVault`, `KeyVaults`, `IdentityProvider`

#![forbid(unsafe_code)]

/// Signed claim payloads
pub mod claims;

/// JWT encoding and verification of claims
pub mod codec;

/// Provider configuration
pub mod config;

/// Store, vault and provider interfaces
pub mod effects;

/// Unified error handling
pub mod errors;

/// Pending key changes
pub mod journal;

/// Ed25519 key pairs and public identifiers
pub mod keys;

/// Operator/account/user tree
pub mod tree;

pub use claims::{
    AccountClaim, AccountFields, ClaimFields, ClaimType, Claims, OperatorClaim, OperatorFields,
    SigningKeys, UserClaim, UserFields, UserScope,
};
pub use codec::{ClaimCodec, JwtCodec};
pub use config::{ConfigDefaults, ConfigMerge, ConfigValidation, ProviderConfig, RosterConfig};
pub use effects::{IdentityProvider, KeyVault, KeyVaults, StoreBackend};
pub use errors::{Result, RosterError};
pub use journal::{KeyChange, KeyJournal};
pub use keys::{KeyPair, KeyRole};
pub use tree::{AccountEditor, AccountNode, OperatorNode, ParentRef, Tracked, UserNode};
