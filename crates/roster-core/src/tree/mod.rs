//! Operator → account → user identity tree
//!
//! Ownership flows strictly downward: an operator owns its accounts, an
//! account owns its users. Upward links are [`ParentRef`] slots holding the
//! parent's name and public key, so nothing in the tree points back at its
//! owner and load/store traversal never walks upward.
//!
//! Change detection is timestamp based. Each node remembers the issued-at of
//! the claim it was loaded or last stored with (`loaded_at`); any edit
//! re-signs the claim with a strictly larger issued-at, which is what the
//! synchronizer looks for.

mod account;
mod operator;
mod user;

pub use account::{AccountEditor, AccountNode};
pub use operator::OperatorNode;
pub use user::UserNode;

use chrono::Utc;

use crate::claims::{ClaimFields, Claims};
use crate::codec::JwtCodec;
use crate::errors::{Result, RosterError};
use crate::keys::KeyPair;

/// Non-owning link from a child to its parent
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentRef {
    /// Parent entity name
    pub name: String,
    /// Parent subject public key
    pub public_key: String,
}

impl ParentRef {
    /// New reference
    pub fn new(name: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
        }
    }
}

/// Sync bookkeeping shared by every node
pub trait Tracked {
    /// Issued-at of the in-memory claim
    fn issued_at(&self) -> i64;

    /// Issued-at as of the last load or store
    fn loaded_at(&self) -> i64;

    /// Overwrite the sync marker
    fn set_loaded_at(&mut self, at: i64);

    /// Never persisted
    fn is_new(&self) -> bool {
        self.loaded_at() == 0
    }

    /// Changed since the last load or store
    fn is_dirty(&self) -> bool {
        self.issued_at() > self.loaded_at()
    }

    /// Record that the current claim is what the store holds
    fn mark_synced(&mut self) {
        let at = self.issued_at();
        self.set_loaded_at(at);
    }
}

/// Issued-at for a re-signed claim: now, but never at or before `previous`
pub fn next_issued_at(previous: i64) -> i64 {
    Utc::now().timestamp().max(previous + 1)
}

/// Stamp `claim` as issued by `signer` and return the new token
pub(crate) fn sign_claim<T: ClaimFields>(claim: &mut Claims<T>, signer: &KeyPair) -> Result<String> {
    claim.iss = signer.public_key();
    claim.iat = next_issued_at(claim.iat);
    JwtCodec.encode(claim, signer)
}

/// Run a caller edit on a claim without letting it change identity fields
pub(crate) fn apply_edit<T>(claim: &mut Claims<T>, f: impl FnOnce(&mut Claims<T>)) {
    let subject = claim.sub.clone();
    let name = claim.name.clone();
    f(claim);
    claim.sub = subject;
    claim.name = name;
}

/// Key used to sign claims on behalf of a parent: its own key, else its first
/// signing key
pub(crate) fn issuer_key<'k>(key: Option<&'k KeyPair>, signing: &'k [KeyPair]) -> Option<&'k KeyPair> {
    key.or_else(|| signing.first())
}

/// Entity names become path components in the store
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RosterError::invalid("name cannot be empty"));
    }
    if name.len() > 255 {
        return Err(RosterError::invalid("name too long (max 255 characters)"));
    }
    if name == "." || name.contains("..") || name.contains(['/', '\\', '\0']) || name.starts_with('.')
    {
        return Err(RosterError::invalid(format!(
            "name {name:?} contains invalid characters"
        )));
    }
    Ok(())
}
