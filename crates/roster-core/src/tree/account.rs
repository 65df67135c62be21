//! Account nodes and their editor

use serde_json::Value;
use tracing::debug;

use crate::claims::{AccountClaim, UserClaim, UserScope};
use crate::errors::{Result, RosterError};
use crate::journal::KeyJournal;
use crate::keys::{KeyPair, KeyRole};

use super::{apply_edit, sign_claim, validate_name, ParentRef, Tracked, UserNode};

/// An account: middle level of the tree
#[derive(Debug, Clone)]
pub struct AccountNode {
    /// Account name, also the store sub-container name
    pub name: String,
    /// Owning key, when present in the vault
    pub key: Option<KeyPair>,
    /// Signing keys listed in the claim and present in the vault
    pub signing_keys: Vec<KeyPair>,
    /// Decoded claim
    pub claim: AccountClaim,
    /// Signed token for `claim`
    pub token: String,
    /// Issued-at of the claim as last loaded or stored
    pub loaded_at: i64,
    /// Live users, in store order
    pub users: Vec<UserNode>,
    /// Users removed since the last store, still present in the store
    pub deleted_users: Vec<UserNode>,
    /// Owning operator
    pub operator: Option<ParentRef>,
}

impl AccountNode {
    /// Fresh, never-stored account signed by `issuer`
    pub(crate) fn create(name: &str, issuer: &KeyPair, operator: ParentRef) -> Result<Self> {
        validate_name(name)?;
        let key = KeyPair::generate(KeyRole::Account);
        let mut claim = AccountClaim::new(name, key.public_key(), issuer.public_key(), 0);
        let token = sign_claim(&mut claim, issuer)?;
        Ok(Self {
            name: name.to_string(),
            key: Some(key),
            signing_keys: Vec::new(),
            claim,
            token,
            loaded_at: 0,
            users: Vec::new(),
            deleted_users: Vec::new(),
            operator: Some(operator),
        })
    }

    /// Subject public key
    pub fn public_key(&self) -> &str {
        &self.claim.sub
    }

    /// Live user by name
    pub fn user(&self, name: &str) -> Option<&UserNode> {
        self.users.iter().find(|u| u.name == name)
    }

    /// True if `public` is one of this account's scoped signing keys
    pub fn is_scoped_key(&self, public: &str) -> bool {
        self.claim.nats.signing_keys.is_scoped(public)
    }

    /// Signing key pair by public key
    pub fn signing_key(&self, public: &str) -> Option<&KeyPair> {
        self.signing_keys.iter().find(|k| k.public_key() == public)
    }

    /// Owning key or signing key with this public key
    fn key_for(&self, public: &str) -> Option<&KeyPair> {
        self.key
            .as_ref()
            .filter(|k| k.public_key() == public)
            .or_else(|| self.signing_key(public))
    }

    /// Point every user back at this account and derive `edits_rejected`
    pub fn link_users(&mut self) {
        let parent = ParentRef::new(&self.name, &self.claim.sub);
        for user in &mut self.users {
            user.account = Some(parent.clone());
            user.edits_rejected = self.claim.nats.signing_keys.is_scoped(&user.claim.iss);
        }
    }

    /// Public keys of everything this account owns: itself, its signing keys
    /// and its users
    pub fn owned_keys(&self) -> Vec<String> {
        let mut keys = vec![self.claim.sub.clone()];
        keys.extend(self.claim.nats.signing_keys.keys().map(str::to_string));
        keys.extend(self.users.iter().map(|u| u.claim.sub.clone()));
        keys
    }
}

impl Tracked for AccountNode {
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

/// Mutable view of one account plus its operator's key journal
///
/// Obtained from [`OperatorNode::account_mut`](super::OperatorNode::account_mut)
/// or [`OperatorNode::add_account`](super::OperatorNode::add_account).
#[derive(Debug)]
pub struct AccountEditor<'a> {
    account: &'a mut AccountNode,
    journal: &'a mut KeyJournal,
    issuer: Option<&'a KeyPair>,
}

impl<'a> AccountEditor<'a> {
    pub(super) fn new(
        account: &'a mut AccountNode,
        journal: &'a mut KeyJournal,
        issuer: Option<&'a KeyPair>,
    ) -> Self {
        Self {
            account,
            journal,
            issuer,
        }
    }

    /// The account being edited
    pub fn node(&self) -> &AccountNode {
        &*self.account
    }

    /// Account name
    pub fn name(&self) -> &str {
        &self.account.name
    }

    /// Subject public key
    pub fn public_key(&self) -> &str {
        self.account.public_key()
    }

    fn operator_key(&self) -> Result<&'a KeyPair> {
        self.issuer.ok_or_else(|| {
            RosterError::crypto(format!(
                "no operator key available to sign account {}",
                self.account.name
            ))
        })
    }

    fn resign(&mut self) -> Result<()> {
        let issuer = self.operator_key()?;
        self.account.token = sign_claim(&mut self.account.claim, issuer)?;
        Ok(())
    }

    /// Edit the account claim and re-sign it
    pub fn edit(&mut self, f: impl FnOnce(&mut AccountClaim)) -> Result<()> {
        self.operator_key()?;
        apply_edit(&mut self.account.claim, f);
        self.resign()
    }

    /// Generate and register an unscoped signing key
    pub fn add_signing_key(&mut self) -> Result<String> {
        self.operator_key()?;
        let key = KeyPair::generate(KeyRole::Account);
        let public = key.public_key();
        self.account.claim.nats.signing_keys.add(public.clone());
        self.account.signing_keys.push(key.clone());
        self.journal.record_added(key);
        self.resign()?;
        Ok(public)
    }

    /// Generate a signing key bound to a permission template
    pub fn add_scope(&mut self, role: &str, template: Value) -> Result<String> {
        self.operator_key()?;
        if self.account.claim.nats.signing_keys.scope_by_role(role).is_some() {
            return Err(RosterError::already_exists(format!(
                "scope {role:?} already exists in account {}",
                self.account.name
            )));
        }
        let key = KeyPair::generate(KeyRole::Account);
        let public = key.public_key();
        self.account
            .claim
            .nats
            .signing_keys
            .add_scope(UserScope::new(public.clone(), role, template));
        self.account.signing_keys.push(key.clone());
        self.journal.record_added(key);
        self.resign()?;
        Ok(public)
    }

    /// Edit the scope attached to a signing key
    pub fn edit_scope(&mut self, public: &str, f: impl FnOnce(&mut UserScope)) -> Result<()> {
        self.operator_key()?;
        let mut scope = self
            .account
            .claim
            .nats
            .signing_keys
            .scope(public)
            .cloned()
            .ok_or_else(|| RosterError::not_found(format!("no scope for key {public}")))?;
        f(&mut scope);
        scope.key = public.to_string();
        self.account.claim.nats.signing_keys.add_scope(scope);
        self.resign()
    }

    /// Retire a signing key; returns false if it was not listed
    pub fn remove_signing_key(&mut self, public: &str) -> Result<bool> {
        if !self.account.claim.nats.signing_keys.contains(public) {
            return Ok(false);
        }
        self.operator_key()?;
        self.account.claim.nats.signing_keys.remove(public);
        self.account.signing_keys.retain(|k| k.public_key() != public);
        self.journal.record_removed(public);
        self.resign()?;
        Ok(true)
    }

    /// Live user by name
    pub fn user(&self, name: &str) -> Option<&UserNode> {
        self.account.user(name)
    }

    /// Create a user issued by the account key, or by the signing key
    /// `signer` when given
    pub fn add_user(&mut self, name: &str, signer: Option<&str>) -> Result<&mut UserNode> {
        validate_name(name)?;
        if self.account.user(name).is_some() {
            return Err(RosterError::already_exists(format!(
                "user {name} already exists in account {}",
                self.account.name
            )));
        }
        if self.account.deleted_users.iter().any(|u| u.name == name) {
            return Err(RosterError::already_exists(format!(
                "user {name} is pending deletion; store before re-adding it"
            )));
        }

        let account_public = self.account.claim.sub.clone();
        let signer = match signer {
            None => self.account.key.clone().ok_or_else(|| {
                RosterError::crypto(format!(
                    "account key for {} is not available",
                    self.account.name
                ))
            })?,
            Some(public) => {
                if !self.account.claim.nats.signing_keys.contains(public) {
                    return Err(RosterError::not_found(format!(
                        "{public} is not a signing key of account {}",
                        self.account.name
                    )));
                }
                self.account.signing_key(public).cloned().ok_or_else(|| {
                    RosterError::crypto(format!("signing key {public} is not in the vault"))
                })?
            }
        };

        let key = KeyPair::generate(KeyRole::User);
        let mut claim = UserClaim::new(name, key.public_key(), signer.public_key(), 0);
        if signer.public_key() != account_public {
            claim.nats.issuer_account = Some(account_public.clone());
        }
        let token = sign_claim(&mut claim, &signer)?;
        let edits_rejected = self.account.is_scoped_key(&claim.iss);

        debug!(account = %self.account.name, user = %name, scoped = edits_rejected, "added user");
        self.journal.record_added(key.clone());
        self.account.users.push(UserNode {
            name: name.to_string(),
            key,
            claim,
            token,
            loaded_at: 0,
            account: Some(ParentRef::new(&self.account.name, account_public)),
            edits_rejected,
        });
        let idx = self.account.users.len() - 1;
        Ok(&mut self.account.users[idx])
    }

    /// Edit a user claim and re-sign it with the key that issued it
    pub fn edit_user(&mut self, name: &str, f: impl FnOnce(&mut UserClaim)) -> Result<()> {
        let idx = self
            .account
            .users
            .iter()
            .position(|u| u.name == name)
            .ok_or_else(|| RosterError::not_found(format!("user {name}")))?;
        if self.account.users[idx].edits_rejected {
            return Err(RosterError::rejected(format!(
                "user {name} is scoped; edit its scope instead"
            )));
        }

        let issuer = self.account.users[idx].claim.iss.clone();
        let signer = self.account.key_for(&issuer).cloned().ok_or_else(|| {
            RosterError::crypto(format!("issuer {issuer} of user {name} is not in the vault"))
        })?;

        let user = &mut self.account.users[idx];
        apply_edit(&mut user.claim, f);
        user.token = sign_claim(&mut user.claim, &signer)?;
        Ok(())
    }

    /// Remove a user; a stored user is queued for deletion on the next store
    pub fn delete_user(&mut self, name: &str) -> bool {
        let Some(idx) = self.account.users.iter().position(|u| u.name == name) else {
            return false;
        };
        let user = self.account.users.remove(idx);
        self.journal.record_removed(user.key.public_key());
        if !user.is_new() {
            self.account.deleted_users.push(user);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::OperatorNode;
    use super::*;
    use crate::codec::{ClaimCodec, JwtCodec};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn operator_with_account() -> OperatorNode {
        let mut op = OperatorNode::create("O").unwrap();
        op.add_account("A").unwrap();
        op
    }

    #[test]
    fn test_add_user_signed_by_account_key() {
        let mut op = operator_with_account();
        let mut a = op.account_mut("A").unwrap();
        let account_public = a.public_key().to_string();
        let user = a.add_user("U", None).unwrap();

        assert_eq!(user.claim.iss, account_public);
        assert!(user.claim.nats.issuer_account.is_none());
        assert!(!user.edits_rejected);
        assert!(user.is_new());
        assert!(user.is_dirty());
        let decoded = JwtCodec.decode_user(&user.token).unwrap();
        assert_eq!(decoded.sub, user.key.public_key());
        assert_eq!(user.account.as_ref().unwrap().name, "A");
    }

    #[test]
    fn test_scoped_user_rejects_direct_edits() {
        let mut op = operator_with_account();
        let mut a = op.account_mut("A").unwrap();
        let scope = a.add_scope("admin", json!({"subs": 10})).unwrap();
        let user = a.add_user("U", Some(&scope)).unwrap();
        assert!(user.edits_rejected);
        assert_eq!(user.claim.iss, scope);

        assert_matches!(
            a.edit_user("U", |c| {
                c.nats.extra.insert("tags".into(), json!(["x"]));
            }),
            Err(RosterError::Rejected { .. })
        );

        a.edit_scope(&scope, |s| s.template = json!({"subs": 20})).unwrap();
        assert_eq!(
            a.node().claim.nats.signing_keys.scope(&scope).unwrap().template,
            json!({"subs": 20})
        );
    }

    #[test]
    fn test_plain_signing_key_user_is_editable() {
        let mut op = operator_with_account();
        let mut a = op.account_mut("A").unwrap();
        let sk = a.add_signing_key().unwrap();
        a.add_user("U", Some(&sk)).unwrap();
        let before = a.user("U").unwrap().claim.iat;

        a.edit_user("U", |c| {
            c.nats.extra.insert("tags".into(), json!(["x"]));
            c.sub = "UHIJACK".into();
        })
        .unwrap();
        let user = a.user("U").unwrap();
        assert!(user.claim.iat > before);
        assert_ne!(user.claim.sub, "UHIJACK");
        assert_eq!(user.claim.nats.issuer_account.as_deref(), Some(a.public_key()));
        assert!(JwtCodec.decode_user(&user.token).is_ok());
    }

    #[test]
    fn test_unknown_signer_is_refused() {
        let mut op = operator_with_account();
        let mut a = op.account_mut("A").unwrap();
        assert_matches!(a.add_user("U", Some("ANOPE")), Err(RosterError::NotFound { .. }));
    }

    #[test]
    fn test_duplicate_scope_role_is_refused() {
        let mut op = operator_with_account();
        let mut a = op.account_mut("A").unwrap();
        a.add_scope("admin", Value::Null).unwrap();
        assert_matches!(
            a.add_scope("admin", Value::Null),
            Err(RosterError::AlreadyExists { .. })
        );
    }

    #[test]
    fn test_delete_new_user_is_not_queued() {
        let mut op = operator_with_account();
        let mut a = op.account_mut("A").unwrap();
        a.add_user("U", None).unwrap();
        assert!(a.delete_user("U"));
        assert!(!a.delete_user("U"));
        assert!(a.node().deleted_users.is_empty());
        assert!(a.node().users.is_empty());
    }

    #[test]
    fn test_delete_stored_user_is_queued_and_key_retired() {
        let mut op = operator_with_account();
        {
            let mut a = op.account_mut("A").unwrap();
            a.add_user("U", None).unwrap().mark_synced();
        }
        op.journal = KeyJournal::new();

        let mut a = op.account_mut("A").unwrap();
        let user_public = a.user("U").unwrap().key.public_key();
        assert!(a.delete_user("U"));
        assert_eq!(a.node().deleted_users.len(), 1);
        assert_matches!(a.add_user("U", None), Err(RosterError::AlreadyExists { .. }));
        assert_eq!(op.journal.removed().collect::<Vec<_>>(), vec![user_public.as_str()]);
    }

    #[test]
    fn test_remove_signing_key_resigns_account() {
        let mut op = operator_with_account();
        let mut a = op.account_mut("A").unwrap();
        let sk = a.add_signing_key().unwrap();
        let iat = a.node().claim.iat;
        assert!(a.remove_signing_key(&sk).unwrap());
        assert!(!a.remove_signing_key(&sk).unwrap());
        assert!(a.node().claim.iat > iat);
        assert!(a.node().signing_keys.is_empty());
        assert!(op.journal.added().all(|k| k.public_key() != sk));
    }
}
