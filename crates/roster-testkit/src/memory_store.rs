//! In-memory claim store
//!
//! Mirrors the directory layout as nested maps and counts every write and
//! delete so tests can assert that a store call touched exactly what it
//! should. Clones share state.

use parking_lot::RwLock;
use roster_core::{KeyPair, Result, RosterError, StoreBackend};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
struct AccountEntry {
    claim: Option<String>,
    users: BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone)]
struct OperatorEntry {
    owner: Option<String>,
    claim: Option<String>,
    accounts: BTreeMap<String, AccountEntry>,
}

#[derive(Debug, Default)]
struct StoreState {
    root_ready: bool,
    operators: BTreeMap<String, OperatorEntry>,
    writes: usize,
    deletes: usize,
    writes_before_failure: Option<usize>,
    fail_deletes: bool,
}

impl StoreState {
    fn begin_write(&mut self, what: &str) -> Result<()> {
        match self.writes_before_failure {
            Some(0) => Err(RosterError::storage(format!("injected write failure: {what}"))),
            Some(ref mut n) => {
                *n -= 1;
                self.writes += 1;
                Ok(())
            }
            None => {
                self.writes += 1;
                Ok(())
            }
        }
    }

    fn begin_delete(&mut self, what: &str) -> Result<()> {
        if self.fail_deletes {
            return Err(RosterError::storage(format!("injected delete failure: {what}")));
        }
        self.deletes += 1;
        Ok(())
    }

    fn operator(&self, operator: &str) -> Result<&OperatorEntry> {
        self.operators
            .get(operator)
            .ok_or_else(|| RosterError::not_found(format!("operator {operator}")))
    }

    fn account(&self, operator: &str, account: &str) -> Result<&AccountEntry> {
        self.operator(operator)?
            .accounts
            .get(account)
            .ok_or_else(|| RosterError::not_found(format!("account {operator}/{account}")))
    }
}

/// Claim store held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim writes and container creations so far
    pub fn writes(&self) -> usize {
        self.state.read().writes
    }

    /// Deletions so far
    pub fn deletes(&self) -> usize {
        self.state.read().deletes
    }

    /// Zero both counters
    pub fn reset_counters(&self) {
        let mut state = self.state.write();
        state.writes = 0;
        state.deletes = 0;
    }

    /// Allow `n` more writes, then fail every write after them
    pub fn fail_writes_after(&self, n: usize) {
        self.state.write().writes_before_failure = Some(n);
    }

    /// Make every deletion fail (or stop failing)
    pub fn fail_deletes(&self, fail: bool) {
        self.state.write().fail_deletes = fail;
    }

    /// Stop injecting write failures
    pub fn clear_failures(&self) {
        let mut state = self.state.write();
        state.writes_before_failure = None;
        state.fail_deletes = false;
    }

    /// True once `ensure_root` has run
    pub fn root_ready(&self) -> bool {
        self.state.read().root_ready
    }

    /// Add an operator container that was never materialized
    pub fn insert_unmaterialized(&self, operator: &str) {
        self.state
            .write()
            .operators
            .entry(operator.to_string())
            .or_default();
    }

    /// Stored operator token
    pub fn operator_claim(&self, operator: &str) -> Option<String> {
        self.state.read().operators.get(operator)?.claim.clone()
    }

    /// Stored account token
    pub fn account_claim(&self, operator: &str, account: &str) -> Option<String> {
        self.state
            .read()
            .operators
            .get(operator)?
            .accounts
            .get(account)?
            .claim
            .clone()
    }

    /// Stored user token
    pub fn user_claim(&self, operator: &str, account: &str, user: &str) -> Option<String> {
        self.state
            .read()
            .operators
            .get(operator)?
            .accounts
            .get(account)?
            .users
            .get(user)
            .cloned()
    }

    /// Overwrite a user token without counting it as a write
    pub fn put_user_claim(&self, operator: &str, account: &str, user: &str, token: &str) {
        self.state
            .write()
            .operators
            .entry(operator.to_string())
            .or_default()
            .accounts
            .entry(account.to_string())
            .or_default()
            .users
            .insert(user.to_string(), token.to_string());
    }
}

impl StoreBackend for MemoryStore {
    fn ensure_root(&self) -> Result<()> {
        self.state.write().root_ready = true;
        Ok(())
    }

    fn list_operators(&self) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .operators
            .iter()
            .filter(|(_, entry)| entry.owner.is_some())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn is_materialized(&self, operator: &str) -> Result<bool> {
        Ok(self
            .state
            .read()
            .operators
            .get(operator)
            .is_some_and(|entry| entry.owner.is_some()))
    }

    fn create_operator(&self, operator: &str, owner: &KeyPair, token: &str) -> Result<()> {
        let mut state = self.state.write();
        let public = owner.public_key();
        if let Some(existing) = state.operators.get(operator).and_then(|e| e.owner.as_ref()) {
            if *existing != public {
                return Err(RosterError::already_exists(format!("operator {operator}")));
            }
        }
        state.begin_write(operator)?;
        let entry = state.operators.entry(operator.to_string()).or_default();
        entry.claim = Some(token.to_string());
        entry.owner = Some(public);
        Ok(())
    }

    fn read_operator_claim(&self, operator: &str) -> Result<String> {
        let state = self.state.read();
        state
            .operator(operator)?
            .claim
            .clone()
            .ok_or_else(|| RosterError::not_found(format!("claim for operator {operator}")))
    }

    fn write_operator_claim(&self, operator: &str, token: &str) -> Result<()> {
        let mut state = self.state.write();
        state.begin_write(operator)?;
        state.operators.entry(operator.to_string()).or_default().claim = Some(token.to_string());
        Ok(())
    }

    fn list_accounts(&self, operator: &str) -> Result<Vec<String>> {
        let state = self.state.read();
        Ok(state
            .operators
            .get(operator)
            .map(|e| e.accounts.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read_account_claim(&self, operator: &str, account: &str) -> Result<String> {
        let state = self.state.read();
        state
            .account(operator, account)?
            .claim
            .clone()
            .ok_or_else(|| RosterError::not_found(format!("claim for account {account}")))
    }

    fn write_account_claim(&self, operator: &str, account: &str, token: &str) -> Result<()> {
        let mut state = self.state.write();
        state.begin_write(account)?;
        state
            .operators
            .entry(operator.to_string())
            .or_default()
            .accounts
            .entry(account.to_string())
            .or_default()
            .claim = Some(token.to_string());
        Ok(())
    }

    fn delete_account(&self, operator: &str, account: &str) -> Result<()> {
        let mut state = self.state.write();
        state.account(operator, account)?;
        state.begin_delete(account)?;
        if let Some(entry) = state.operators.get_mut(operator) {
            entry.accounts.remove(account);
        }
        Ok(())
    }

    fn list_users(&self, operator: &str, account: &str) -> Result<Vec<String>> {
        let state = self.state.read();
        Ok(state
            .account(operator, account)
            .map(|a| a.users.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read_user_claim(&self, operator: &str, account: &str, user: &str) -> Result<String> {
        let state = self.state.read();
        state
            .account(operator, account)?
            .users
            .get(user)
            .cloned()
            .ok_or_else(|| RosterError::not_found(format!("user {account}/{user}")))
    }

    fn write_user_claim(
        &self,
        operator: &str,
        account: &str,
        user: &str,
        token: &str,
    ) -> Result<()> {
        let mut state = self.state.write();
        state.begin_write(user)?;
        state
            .operators
            .entry(operator.to_string())
            .or_default()
            .accounts
            .entry(account.to_string())
            .or_default()
            .users
            .insert(user.to_string(), token.to_string());
        Ok(())
    }

    fn delete_user(&self, operator: &str, account: &str, user: &str) -> Result<()> {
        let mut state = self.state.write();
        if !state.account(operator, account)?.users.contains_key(user) {
            return Err(RosterError::not_found(format!("user {account}/{user}")));
        }
        state.begin_delete(user)?;
        if let Some(entry) = state
            .operators
            .get_mut(operator)
            .and_then(|o| o.accounts.get_mut(account))
        {
            entry.users.remove(user);
        }
        Ok(())
    }
}
