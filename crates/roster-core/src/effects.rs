//! Collaborator interfaces
//!
//! The loader and synchronizer never touch the filesystem or key material
//! directly. They go through a [`StoreBackend`] for claim tokens and a
//! per-operator [`KeyVault`] for key pairs, so the same engine runs against
//! the directory layout in `roster-store` and the in-memory doubles in
//! `roster-testkit`.
//!
//! All methods are blocking. A single writer per store root is assumed.

use crate::errors::Result;
use crate::keys::KeyPair;
use crate::tree::OperatorNode;

/// Directory-shaped claim storage: operator containers holding account
/// sub-containers holding user entries
pub trait StoreBackend {
    /// Create the store root if it does not exist
    fn ensure_root(&self) -> Result<()>;

    /// Names of materialized operator containers, sorted
    fn list_operators(&self) -> Result<Vec<String>>;

    /// True once `create_operator` has completed for `operator`
    fn is_materialized(&self, operator: &str) -> Result<bool>;

    /// Create the container for a new operator owned by `owner`, holding
    /// `token` as its claim
    ///
    /// The container only becomes materialized once the claim is in place.
    /// Calling this again with the same owner rewrites the claim and
    /// succeeds; a different owner is `AlreadyExists`.
    fn create_operator(&self, operator: &str, owner: &KeyPair, token: &str) -> Result<()>;

    /// Raw operator token
    fn read_operator_claim(&self, operator: &str) -> Result<String>;

    /// Replace the operator token
    fn write_operator_claim(&self, operator: &str, token: &str) -> Result<()>;

    /// Account names under an operator, sorted
    fn list_accounts(&self, operator: &str) -> Result<Vec<String>>;

    /// Raw account token
    fn read_account_claim(&self, operator: &str, account: &str) -> Result<String>;

    /// Write an account token, creating the sub-container if needed
    fn write_account_claim(&self, operator: &str, account: &str, token: &str) -> Result<()>;

    /// Remove an account sub-container and everything under it
    fn delete_account(&self, operator: &str, account: &str) -> Result<()>;

    /// User names under an account, sorted
    fn list_users(&self, operator: &str, account: &str) -> Result<Vec<String>>;

    /// Raw user token
    fn read_user_claim(&self, operator: &str, account: &str, user: &str) -> Result<String>;

    /// Write a user token
    fn write_user_claim(&self, operator: &str, account: &str, user: &str, token: &str)
        -> Result<()>;

    /// Remove a user entry; an absent entry is an error
    fn delete_user(&self, operator: &str, account: &str, user: &str) -> Result<()>;
}

/// Key pairs belonging to one operator, addressed by public key
pub trait KeyVault {
    /// Look up a key pair; `Ok(None)` when the vault does not hold it
    fn get_key_pair(&self, public: &str) -> Result<Option<KeyPair>>;

    /// Persist a key pair and return its public key
    fn store_key_pair(&self, pair: &KeyPair) -> Result<String>;

    /// Forget a key pair; removing an absent key succeeds
    fn remove_key_pair(&self, public: &str) -> Result<()>;
}

/// Opens the vault for an operator
pub trait KeyVaults {
    /// Vault handle type
    type Vault: KeyVault;

    /// Open (creating if needed) the vault for `operator`
    fn open(&self, operator: &str) -> Result<Self::Vault>;
}

/// Load/store entry points exposed upstream
pub trait IdentityProvider {
    /// Read every materialized operator with its accounts, users and keys
    fn load(&self) -> Result<Vec<OperatorNode>>;

    /// Persist whatever changed in `operators` since they were loaded
    fn store(&self, operators: &mut [OperatorNode]) -> Result<()>;
}

impl<T: StoreBackend + ?Sized> StoreBackend for &T {
    fn ensure_root(&self) -> Result<()> {
        (**self).ensure_root()
    }

    fn list_operators(&self) -> Result<Vec<String>> {
        (**self).list_operators()
    }

    fn is_materialized(&self, operator: &str) -> Result<bool> {
        (**self).is_materialized(operator)
    }

    fn create_operator(&self, operator: &str, owner: &KeyPair, token: &str) -> Result<()> {
        (**self).create_operator(operator, owner, token)
    }

    fn read_operator_claim(&self, operator: &str) -> Result<String> {
        (**self).read_operator_claim(operator)
    }

    fn write_operator_claim(&self, operator: &str, token: &str) -> Result<()> {
        (**self).write_operator_claim(operator, token)
    }

    fn list_accounts(&self, operator: &str) -> Result<Vec<String>> {
        (**self).list_accounts(operator)
    }

    fn read_account_claim(&self, operator: &str, account: &str) -> Result<String> {
        (**self).read_account_claim(operator, account)
    }

    fn write_account_claim(&self, operator: &str, account: &str, token: &str) -> Result<()> {
        (**self).write_account_claim(operator, account, token)
    }

    fn delete_account(&self, operator: &str, account: &str) -> Result<()> {
        (**self).delete_account(operator, account)
    }

    fn list_users(&self, operator: &str, account: &str) -> Result<Vec<String>> {
        (**self).list_users(operator, account)
    }

    fn read_user_claim(&self, operator: &str, account: &str, user: &str) -> Result<String> {
        (**self).read_user_claim(operator, account, user)
    }

    fn write_user_claim(
        &self,
        operator: &str,
        account: &str,
        user: &str,
        token: &str,
    ) -> Result<()> {
        (**self).write_user_claim(operator, account, user, token)
    }

    fn delete_user(&self, operator: &str, account: &str, user: &str) -> Result<()> {
        (**self).delete_user(operator, account, user)
    }
}

impl<T: KeyVaults + ?Sized> KeyVaults for &T {
    type Vault = T::Vault;

    fn open(&self, operator: &str) -> Result<Self::Vault> {
        (**self).open(operator)
    }
}
