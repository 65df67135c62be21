//! Tree reconstruction from a store
//!
//! One pass over the store: operators, then each operator's accounts, then
//! each account's users, resolving keys from the operator's vault as it goes.
//! Any failure aborts the whole load; containers that were never
//! materialized are not failures and are simply not listed.

use roster_core::{
    AccountNode, ClaimCodec, KeyJournal, KeyPair, KeyVault, KeyVaults, OperatorNode, Result,
    RosterError, StoreBackend, UserNode,
};
use tracing::{debug, info, warn};

/// Reads the whole identity tree from a store and its vaults
pub struct Loader<'a, S, V, C> {
    store: &'a S,
    vaults: &'a V,
    codec: &'a C,
}

impl<'a, S, V, C> Loader<'a, S, V, C>
where
    S: StoreBackend,
    V: KeyVaults,
    C: ClaimCodec,
{
    /// Loader over the given collaborators
    pub fn new(store: &'a S, vaults: &'a V, codec: &'a C) -> Self {
        Self {
            store,
            vaults,
            codec,
        }
    }

    /// Every materialized operator, in store order
    pub fn load(&self) -> Result<Vec<OperatorNode>> {
        self.store.ensure_root()?;
        let operators = self
            .store
            .list_operators()?
            .iter()
            .map(|name| self.load_operator(name))
            .collect::<Result<Vec<_>>>()?;
        info!(operators = operators.len(), "loaded identity tree");
        Ok(operators)
    }

    /// Load one operator with its whole subtree
    pub fn load_operator(&self, name: &str) -> Result<OperatorNode> {
        let token = self.store.read_operator_claim(name)?;
        let claim = self.codec.decode_operator(&token)?;
        let vault = self.vaults.open(name)?;

        let key = optional_key(&vault, &claim.iss, name)?;
        let signing_keys = signing_keys(&vault, claim.nats.signing_keys.iter(), name)?;

        let accounts = self
            .store
            .list_accounts(name)?
            .iter()
            .map(|account| self.load_account(name, &vault, account))
            .collect::<Result<Vec<_>>>()?;

        let mut operator = OperatorNode {
            name: name.to_string(),
            key,
            signing_keys,
            loaded_at: claim.iat,
            token: token.trim().to_string(),
            claim,
            accounts,
            deleted_accounts: Vec::new(),
            journal: KeyJournal::new(),
        };
        operator.link_accounts();
        debug!(
            operator = %name,
            accounts = operator.accounts.len(),
            "loaded operator"
        );
        Ok(operator)
    }

    fn load_account(
        &self,
        operator: &str,
        vault: &V::Vault,
        name: &str,
    ) -> Result<AccountNode> {
        let token = self.store.read_account_claim(operator, name)?;
        let claim = self.codec.decode_account(&token)?;

        let key = optional_key(vault, &claim.sub, name)?;
        let signing_keys = signing_keys(vault, claim.nats.signing_keys.keys(), name)?;

        let users = self
            .store
            .list_users(operator, name)?
            .iter()
            .map(|user| self.load_user(operator, vault, name, user))
            .collect::<Result<Vec<_>>>()?;

        let mut account = AccountNode {
            name: name.to_string(),
            key,
            signing_keys,
            loaded_at: claim.iat,
            token: token.trim().to_string(),
            claim,
            users,
            deleted_users: Vec::new(),
            operator: None,
        };
        account.link_users();
        debug!(account = %name, users = account.users.len(), "loaded account");
        Ok(account)
    }

    fn load_user(
        &self,
        operator: &str,
        vault: &V::Vault,
        account: &str,
        name: &str,
    ) -> Result<UserNode> {
        let token = self.store.read_user_claim(operator, account, name)?;
        let claim = self.codec.decode_user(&token)?;
        let key = vault.get_key_pair(&claim.sub)?.ok_or_else(|| {
            RosterError::not_found(format!(
                "key {} for user {account}/{name} is not in the vault",
                claim.sub
            ))
        })?;

        Ok(UserNode {
            name: name.to_string(),
            key,
            loaded_at: claim.iat,
            token: token.trim().to_string(),
            claim,
            account: None,
            edits_rejected: false,
        })
    }
}

fn optional_key(vault: &impl KeyVault, public: &str, owner: &str) -> Result<Option<KeyPair>> {
    let key = vault.get_key_pair(public)?;
    if key.is_none() {
        warn!(entity = %owner, public = %public, "owning key not in vault; entity is read-only");
    }
    Ok(key)
}

fn signing_keys(
    vault: &impl KeyVault,
    declared: impl Iterator<Item = impl AsRef<str>>,
    owner: &str,
) -> Result<Vec<KeyPair>> {
    let mut keys = Vec::new();
    for public in declared {
        let public = public.as_ref();
        match vault.get_key_pair(public)? {
            Some(pair) => keys.push(pair),
            None => warn!(entity = %owner, public = %public, "signing key not in vault; skipped"),
        }
    }
    Ok(keys)
}
