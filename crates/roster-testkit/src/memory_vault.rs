//! In-memory key vaults

use parking_lot::RwLock;
use roster_core::{KeyPair, KeyVault, KeyVaults, Result, RosterError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Default)]
struct VaultState {
    keys: BTreeMap<String, BTreeMap<String, KeyPair>>,
    opened: usize,
    stored: usize,
    removed: usize,
    fail_open: BTreeSet<String>,
}

/// Every operator's vault, held in memory; clones share state
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyVaults {
    state: Arc<RwLock<VaultState>>,
}

impl MemoryKeyVaults {
    /// No vaults
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `operator`'s vault holds `public`
    pub fn contains(&self, operator: &str, public: &str) -> bool {
        self.state
            .read()
            .keys
            .get(operator)
            .is_some_and(|v| v.contains_key(public))
    }

    /// Public keys held for `operator`
    pub fn keys(&self, operator: &str) -> Vec<String> {
        self.state
            .read()
            .keys
            .get(operator)
            .map(|v| v.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a key behind the engine's back, as if it were never saved
    pub fn forget(&self, operator: &str, public: &str) {
        if let Some(vault) = self.state.write().keys.get_mut(operator) {
            vault.remove(public);
        }
    }

    /// Number of `open` calls
    pub fn opened(&self) -> usize {
        self.state.read().opened
    }

    /// Number of successful `store_key_pair` calls
    pub fn stored(&self) -> usize {
        self.state.read().stored
    }

    /// Number of `remove_key_pair` calls that removed something
    pub fn removed(&self) -> usize {
        self.state.read().removed
    }

    /// Make opening `operator`'s vault fail
    pub fn fail_open(&self, operator: &str) {
        self.state.write().fail_open.insert(operator.to_string());
    }

    /// Undo every [`fail_open`](Self::fail_open)
    pub fn clear_failures(&self) {
        self.state.write().fail_open.clear();
    }
}

impl KeyVaults for MemoryKeyVaults {
    type Vault = MemoryKeyVault;

    fn open(&self, operator: &str) -> Result<MemoryKeyVault> {
        let mut state = self.state.write();
        if state.fail_open.contains(operator) {
            return Err(RosterError::storage(format!(
                "injected failure opening vault {operator}"
            )));
        }
        state.opened += 1;
        state.keys.entry(operator.to_string()).or_default();
        Ok(MemoryKeyVault {
            operator: operator.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}

/// Handle on one operator's in-memory vault
#[derive(Debug, Clone)]
pub struct MemoryKeyVault {
    operator: String,
    state: Arc<RwLock<VaultState>>,
}

impl KeyVault for MemoryKeyVault {
    fn get_key_pair(&self, public: &str) -> Result<Option<KeyPair>> {
        Ok(self
            .state
            .read()
            .keys
            .get(&self.operator)
            .and_then(|v| v.get(public))
            .cloned())
    }

    fn store_key_pair(&self, pair: &KeyPair) -> Result<String> {
        let public = pair.public_key();
        let mut state = self.state.write();
        state
            .keys
            .entry(self.operator.clone())
            .or_default()
            .insert(public.clone(), pair.clone());
        state.stored += 1;
        Ok(public)
    }

    fn remove_key_pair(&self, public: &str) -> Result<()> {
        let mut state = self.state.write();
        let removed = state
            .keys
            .get_mut(&self.operator)
            .and_then(|v| v.remove(public))
            .is_some();
        if removed {
            state.removed += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::KeyRole;

    #[test]
    fn test_clones_share_keys() {
        let vaults = MemoryKeyVaults::new();
        let pair = KeyPair::generate(KeyRole::User);
        vaults.clone().open("O").unwrap().store_key_pair(&pair).unwrap();

        assert!(vaults.contains("O", &pair.public_key()));
        assert!(!vaults.contains("P", &pair.public_key()));

        vaults.forget("O", &pair.public_key());
        let vault = vaults.open("O").unwrap();
        assert_eq!(vault.get_key_pair(&pair.public_key()).unwrap(), None);
        vault.remove_key_pair(&pair.public_key()).unwrap();
        assert_eq!(vaults.removed(), 0);
        assert_eq!(vaults.opened(), 2);
    }
}
