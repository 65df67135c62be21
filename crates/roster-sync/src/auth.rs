//! Session over a loaded identity tree

use roster_core::{IdentityProvider, OperatorNode, Result, RosterError};
use tracing::debug;

/// Loaded operators plus the provider they came from
///
/// Mutate through [`Auth::operator_mut`] and [`Auth::add_operator`], then
/// [`Auth::commit`] to write back only what changed.
pub struct Auth<P: IdentityProvider> {
    provider: P,
    operators: Vec<OperatorNode>,
}

impl<P: IdentityProvider> Auth<P> {
    /// Load everything `provider` holds
    pub fn new(provider: P) -> Result<Self> {
        let operators = provider.load()?;
        Ok(Self {
            provider,
            operators,
        })
    }

    /// Underlying provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Loaded operators, in store order, then added ones
    pub fn operators(&self) -> &[OperatorNode] {
        &self.operators
    }

    /// Operator by name
    pub fn operator(&self, name: &str) -> Option<&OperatorNode> {
        self.operators.iter().find(|o| o.name == name)
    }

    /// Operator by name, for editing
    pub fn operator_mut(&mut self, name: &str) -> Option<&mut OperatorNode> {
        self.operators.iter_mut().find(|o| o.name == name)
    }

    /// Create an operator; it is materialized on the next commit
    pub fn add_operator(&mut self, name: &str) -> Result<&mut OperatorNode> {
        if self.operator(name).is_some() {
            return Err(RosterError::already_exists(format!(
                "operator {name} already exists"
            )));
        }
        self.operators.push(OperatorNode::create(name)?);
        debug!(operator = %name, "added operator");
        let idx = self.operators.len() - 1;
        Ok(&mut self.operators[idx])
    }

    /// True if a commit would change anything
    pub fn has_pending_changes(&self) -> bool {
        self.operators.iter().any(OperatorNode::has_pending_changes)
    }

    /// Write back every change
    pub fn commit(&mut self) -> Result<()> {
        self.provider.store(&mut self.operators)
    }

    /// Discard in-memory state and load again
    pub fn reload(&mut self) -> Result<()> {
        self.operators = self.provider.load()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Provider;
    use assert_matches::assert_matches;
    use roster_testkit::{MemoryKeyVaults, MemoryStore};

    fn auth() -> (MemoryStore, Auth<Provider<MemoryStore, MemoryKeyVaults>>) {
        let store = MemoryStore::new();
        let provider = Provider::new(store.clone(), MemoryKeyVaults::new());
        (store, Auth::new(provider).unwrap())
    }

    #[test]
    fn test_add_commit_reload() {
        let (store, mut auth) = auth();
        assert!(auth.operators().is_empty());

        auth.add_operator("O")
            .unwrap()
            .add_account("A")
            .unwrap()
            .add_user("U", None)
            .unwrap();
        assert!(auth.has_pending_changes());
        auth.commit().unwrap();
        assert!(!auth.has_pending_changes());
        let token = &auth.operator("O").unwrap().accounts[0].users[0].token;
        assert_eq!(store.user_claim("O", "A", "U").as_ref(), Some(token));

        auth.reload().unwrap();
        let operator = auth.operator("O").unwrap();
        assert_eq!(operator.accounts.len(), 1);
        assert_eq!(operator.accounts[0].users[0].name, "U");
    }

    #[test]
    fn test_duplicate_operator_is_refused() {
        let (_store, mut auth) = auth();
        auth.add_operator("O").unwrap();
        assert_matches!(auth.add_operator("O"), Err(RosterError::AlreadyExists { .. }));
    }

    #[test]
    fn test_reload_discards_uncommitted_edits() {
        let (_store, mut auth) = auth();
        auth.add_operator("O").unwrap();
        auth.commit().unwrap();

        auth.operator_mut("O").unwrap().add_account("A").unwrap();
        auth.reload().unwrap();
        assert!(auth.operator("O").unwrap().accounts.is_empty());
    }
}
