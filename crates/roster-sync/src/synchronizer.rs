//! Minimal write-back of a mutated tree
//!
//! Nothing is diffed. A node is written iff its claim was re-signed since it
//! was loaded (`issued_at > loaded_at`), keys move through the operator's
//! journal, and deletions come from the pending-deleted lists. Operators are
//! processed in order and the first failure aborts the call without undoing
//! writes already made.
//!
//! A new operator's container is created together with its claim, so a
//! failure later in the pass leaves a loadable store. Storing the same tree
//! again resumes the creation instead of conflicting with it.

use roster_core::{
    KeyVault, KeyVaults, OperatorNode, Result, RosterError, StoreBackend, Tracked,
};
use tracing::{debug, info};

/// What one operator's store pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    /// Operator container created
    pub materialized: bool,
    /// Claims written at any level
    pub claims_written: usize,
    /// Key pairs persisted
    pub keys_added: usize,
    /// Key pairs removed
    pub keys_removed: usize,
    /// User entries deleted
    pub users_deleted: usize,
    /// Account sub-containers deleted
    pub accounts_deleted: usize,
}

impl StoreSummary {
    /// True if the pass touched neither the store nor the vault
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Writes changed parts of the tree back to a store and its vaults
pub struct Synchronizer<'a, S, V> {
    store: &'a S,
    vaults: &'a V,
}

impl<'a, S, V> Synchronizer<'a, S, V>
where
    S: StoreBackend,
    V: KeyVaults,
{
    /// Synchronizer over the given collaborators
    pub fn new(store: &'a S, vaults: &'a V) -> Self {
        Self { store, vaults }
    }

    /// Store every operator in sequence, stopping at the first failure
    pub fn store(&self, operators: &mut [OperatorNode]) -> Result<Vec<StoreSummary>> {
        operators
            .iter_mut()
            .map(|operator| self.store_operator(operator))
            .collect()
    }

    /// Store one operator and its subtree
    pub fn store_operator(&self, operator: &mut OperatorNode) -> Result<StoreSummary> {
        let mut summary = StoreSummary::default();

        if operator.is_new() {
            self.materialize(operator)?;
            summary.materialized = true;
            summary.claims_written += 1;
        }

        if !self.store.is_materialized(&operator.name)? {
            return Err(RosterError::not_found(format!(
                "operator container {} is not materialized",
                operator.name
            )));
        }

        // A fresh container already holds the current claim
        if operator.is_dirty() && !summary.materialized {
            self.store
                .write_operator_claim(&operator.name, &operator.token)?;
            summary.claims_written += 1;
        }

        self.reconcile_keys(operator, &mut summary)?;

        let name = operator.name.clone();
        for account in &mut operator.accounts {
            if account.is_dirty() {
                self.store
                    .write_account_claim(&name, &account.name, &account.token)?;
                account.mark_synced();
                summary.claims_written += 1;
            }

            for user in &mut account.users {
                if user.is_dirty() {
                    self.store
                        .write_user_claim(&name, &account.name, &user.name, &user.token)?;
                    user.mark_synced();
                    summary.claims_written += 1;
                }
            }

            while let Some(user) = account.deleted_users.first() {
                self.store.delete_user(&name, &account.name, &user.name)?;
                debug!(operator = %name, account = %account.name, user = %user.name, "deleted user");
                account.deleted_users.remove(0);
                summary.users_deleted += 1;
            }
        }

        while let Some(account) = operator.deleted_accounts.first() {
            self.store.delete_account(&name, &account.name)?;
            debug!(operator = %name, account = %account.name, "deleted account");
            operator.deleted_accounts.remove(0);
            summary.accounts_deleted += 1;
        }

        operator.mark_synced();

        if summary.is_noop() {
            debug!(operator = %name, "nothing to store");
        } else {
            info!(
                operator = %name,
                materialized = summary.materialized,
                claims = summary.claims_written,
                keys_added = summary.keys_added,
                keys_removed = summary.keys_removed,
                users_deleted = summary.users_deleted,
                accounts_deleted = summary.accounts_deleted,
                "stored operator"
            );
        }
        Ok(summary)
    }

    fn materialize(&self, operator: &OperatorNode) -> Result<()> {
        let owner = operator.key.as_ref().ok_or_else(|| {
            RosterError::crypto(format!(
                "new operator {} has no owning key",
                operator.name
            ))
        })?;
        self.store
            .create_operator(&operator.name, owner, &operator.token)?;
        self.vaults.open(&operator.name)?.store_key_pair(owner)?;
        info!(operator = %operator.name, public = %owner.public_key(), "materialized operator");
        Ok(())
    }

    fn reconcile_keys(&self, operator: &mut OperatorNode, summary: &mut StoreSummary) -> Result<()> {
        if operator.journal.is_empty() {
            return Ok(());
        }
        let vault = self.vaults.open(&operator.name)?;

        for pair in operator.journal.added() {
            vault.store_key_pair(pair)?;
            summary.keys_added += 1;
        }
        operator.journal.clear_added();

        for public in operator.journal.removed() {
            vault.remove_key_pair(public)?;
            summary.keys_removed += 1;
        }
        operator.journal.clear_removed();

        debug!(
            operator = %operator.name,
            added = summary.keys_added,
            removed = summary.keys_removed,
            "reconciled keys"
        );
        Ok(())
    }
}
