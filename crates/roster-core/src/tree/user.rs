//! User leaves

use crate::claims::UserClaim;
use crate::keys::KeyPair;

use super::{ParentRef, Tracked};

/// A user: leaf of the tree
#[derive(Debug, Clone)]
pub struct UserNode {
    /// User name, also the store entry name
    pub name: String,
    /// Owning key; a user is unusable without it
    pub key: KeyPair,
    /// Decoded claim
    pub claim: UserClaim,
    /// Signed token for `claim`
    pub token: String,
    /// Issued-at of the claim as last loaded or stored
    pub loaded_at: i64,
    /// Owning account
    pub account: Option<ParentRef>,
    /// Issued by a scoped signing key; edit the scope instead
    pub edits_rejected: bool,
}

impl UserNode {
    /// Subject public key
    pub fn public_key(&self) -> &str {
        &self.claim.sub
    }

    /// Public key of the signer that issued this user
    pub fn issuer(&self) -> &str {
        &self.claim.iss
    }
}

impl Tracked for UserNode {
    fn issued_at(&self) -> i64 {
        self.claim.iat
    }

    fn loaded_at(&self) -> i64 {
        self.loaded_at
    }

    fn set_loaded_at(&mut self, at: i64) {
        self.loaded_at = at;
    }
}
