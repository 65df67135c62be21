//! Operator nodes
//!
//! The operator owns the key journal for its whole subtree. Accounts are
//! edited through an [`AccountEditor`](super::AccountEditor) that borrows
//! that journal.

use tracing::debug;

use crate::claims::OperatorClaim;
use crate::errors::{Result, RosterError};
use crate::journal::KeyJournal;
use crate::keys::{KeyPair, KeyRole};

use super::{
    apply_edit, issuer_key, sign_claim, validate_name, AccountEditor, AccountNode, ParentRef,
    Tracked,
};

/// An operator: root of one store container and one key vault
#[derive(Debug, Clone)]
pub struct OperatorNode {
    /// Operator name, also the store container and vault name
    pub name: String,
    /// Owning key, when present in the vault
    pub key: Option<KeyPair>,
    /// Signing keys listed in the claim and present in the vault
    pub signing_keys: Vec<KeyPair>,
    /// Decoded claim
    pub claim: OperatorClaim,
    /// Signed token for `claim`
    pub token: String,
    /// Issued-at of the claim as last loaded or stored; zero when never stored
    pub loaded_at: i64,
    /// Live accounts, in store order
    pub accounts: Vec<AccountNode>,
    /// Accounts removed since the last store, still present in the store
    pub deleted_accounts: Vec<AccountNode>,
    /// Key changes for the whole subtree, drained on store
    pub journal: KeyJournal,
}

impl OperatorNode {
    /// Fresh, self-signed operator that has never been stored
    pub fn create(name: &str) -> Result<Self> {
        validate_name(name)?;
        let key = KeyPair::generate(KeyRole::Operator);
        let mut claim = OperatorClaim::new(name, key.public_key(), key.public_key(), 0);
        let token = sign_claim(&mut claim, &key)?;
        debug!(operator = %name, public = %claim.sub, "created operator");
        Ok(Self {
            name: name.to_string(),
            key: Some(key),
            signing_keys: Vec::new(),
            claim,
            token,
            loaded_at: 0,
            accounts: Vec::new(),
            deleted_accounts: Vec::new(),
            journal: KeyJournal::new(),
        })
    }

    /// Subject public key
    pub fn public_key(&self) -> &str {
        &self.claim.sub
    }

    /// Live account by name
    pub fn account(&self, name: &str) -> Option<&AccountNode> {
        self.accounts.iter().find(|a| a.name == name)
    }

    /// Editor for a live account
    pub fn account_mut(&mut self, name: &str) -> Option<AccountEditor<'_>> {
        let idx = self.accounts.iter().position(|a| a.name == name)?;
        Some(self.editor(idx))
    }

    fn editor(&mut self, idx: usize) -> AccountEditor<'_> {
        AccountEditor::new(
            &mut self.accounts[idx],
            &mut self.journal,
            issuer_key(self.key.as_ref(), &self.signing_keys),
        )
    }

    /// Create an account signed by this operator
    pub fn add_account(&mut self, name: &str) -> Result<AccountEditor<'_>> {
        if self.account(name).is_some() {
            return Err(RosterError::already_exists(format!(
                "account {name} already exists in operator {}",
                self.name
            )));
        }
        if self.deleted_accounts.iter().any(|a| a.name == name) {
            return Err(RosterError::already_exists(format!(
                "account {name} is pending deletion; store before re-adding it"
            )));
        }
        let issuer = issuer_key(self.key.as_ref(), &self.signing_keys).ok_or_else(|| {
            RosterError::crypto(format!("no key available to sign for operator {}", self.name))
        })?;

        let account = AccountNode::create(name, issuer, ParentRef::new(&self.name, &self.claim.sub))?;
        if let Some(key) = &account.key {
            self.journal.record_added(key.clone());
        }
        debug!(operator = %self.name, account = %name, "added account");
        self.accounts.push(account);
        let idx = self.accounts.len() - 1;
        Ok(self.editor(idx))
    }

    /// Remove an account; a stored account is queued for deletion on the
    /// next store and every key it owns is retired
    pub fn delete_account(&mut self, name: &str) -> bool {
        let Some(idx) = self.accounts.iter().position(|a| a.name == name) else {
            return false;
        };
        let account = self.accounts.remove(idx);
        for public in account.owned_keys() {
            self.journal.record_removed(public);
        }
        if !account.is_new() {
            self.deleted_accounts.push(account);
        }
        true
    }

    fn own_key(&self) -> Result<&KeyPair> {
        self.key.as_ref().ok_or_else(|| {
            RosterError::crypto(format!("operator key for {} is not in the vault", self.name))
        })
    }

    /// Edit the operator claim and re-sign it
    pub fn edit(&mut self, f: impl FnOnce(&mut OperatorClaim)) -> Result<()> {
        self.own_key()?;
        apply_edit(&mut self.claim, f);
        self.resign()
    }

    fn resign(&mut self) -> Result<()> {
        let key = self.key.as_ref().ok_or_else(|| {
            RosterError::crypto(format!("operator key for {} is not in the vault", self.name))
        })?;
        self.token = sign_claim(&mut self.claim, key)?;
        Ok(())
    }

    /// Generate and register an operator signing key
    pub fn add_signing_key(&mut self) -> Result<String> {
        self.own_key()?;
        let key = KeyPair::generate(KeyRole::Operator);
        let public = key.public_key();
        self.claim.nats.signing_keys.push(public.clone());
        self.signing_keys.push(key.clone());
        self.journal.record_added(key);
        self.resign()?;
        Ok(public)
    }

    /// Retire an operator signing key; returns false if it was not listed
    pub fn remove_signing_key(&mut self, public: &str) -> Result<bool> {
        if !self.claim.nats.signing_keys.iter().any(|k| k == public) {
            return Ok(false);
        }
        self.own_key()?;
        self.claim.nats.signing_keys.retain(|k| k != public);
        self.signing_keys.retain(|k| k.public_key() != public);
        self.journal.record_removed(public);
        self.resign()?;
        Ok(true)
    }

    /// Point every account back at this operator
    pub fn link_accounts(&mut self) {
        let parent = ParentRef::new(&self.name, &self.claim.sub);
        for account in &mut self.accounts {
            account.operator = Some(parent.clone());
        }
    }

    /// True if a store would write, delete or touch the vault
    pub fn has_pending_changes(&self) -> bool {
        self.is_dirty()
            || !self.journal.is_empty()
            || !self.deleted_accounts.is_empty()
            || self.accounts.iter().any(|a| {
                a.is_dirty() || !a.deleted_users.is_empty() || a.users.iter().any(Tracked::is_dirty)
            })
    }
}

impl Tracked for OperatorNode {
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
