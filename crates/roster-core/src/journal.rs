//! Deferred key changes
//!
//! Key material created or retired while editing the tree is not written to
//! the vault immediately. Each operator carries one [`KeyJournal`] that every
//! level of its subtree appends to; the synchronizer drains it into the
//! operator's vault on the next store.

use crate::keys::KeyPair;

/// One pending change to the vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyChange {
    /// Persist this key pair
    Added(KeyPair),
    /// Remove the key pair with this public identifier
    Removed(String),
}

impl KeyChange {
    /// Public identifier the change applies to
    pub fn public_key(&self) -> String {
        match self {
            KeyChange::Added(pair) => pair.public_key(),
            KeyChange::Removed(public) => public.clone(),
        }
    }
}

/// Ordered log of pending key additions and removals
///
/// Recording a change for a key cancels any earlier opposite change for the
/// same key, so applying every addition before every removal gives the same
/// vault contents as replaying the log in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyJournal {
    entries: Vec<KeyChange>,
}

impl KeyJournal {
    /// Empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key to persist
    pub fn record_added(&mut self, pair: KeyPair) {
        let public = pair.public_key();
        self.entries
            .retain(|e| !matches!(e, KeyChange::Removed(p) if *p == public));
        self.entries.push(KeyChange::Added(pair));
    }

    /// Record a key to remove
    pub fn record_removed(&mut self, public: impl Into<String>) {
        let public = public.into();
        self.entries
            .retain(|e| !matches!(e, KeyChange::Added(k) if k.public_key() == public));
        if !self.removed().any(|p| p == public) {
            self.entries.push(KeyChange::Removed(public));
        }
    }

    /// Pending additions, oldest first
    pub fn added(&self) -> impl Iterator<Item = &KeyPair> {
        self.entries.iter().filter_map(|e| match e {
            KeyChange::Added(pair) => Some(pair),
            KeyChange::Removed(_) => None,
        })
    }

    /// Pending removals, oldest first
    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            KeyChange::Removed(public) => Some(public.as_str()),
            KeyChange::Added(_) => None,
        })
    }

    /// Drop all pending additions
    pub fn clear_added(&mut self) {
        self.entries.retain(|e| matches!(e, KeyChange::Removed(_)));
    }

    /// Drop all pending removals
    pub fn clear_removed(&mut self) {
        self.entries.retain(|e| matches!(e, KeyChange::Added(_)));
    }

    /// Every pending change in recording order
    pub fn entries(&self) -> &[KeyChange] {
        &self.entries
    }

    /// Number of pending changes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyRole;

    #[test]
    fn test_additions_and_removals_are_split() {
        let a = KeyPair::generate(KeyRole::User);
        let b = KeyPair::generate(KeyRole::User);
        let mut journal = KeyJournal::new();
        journal.record_added(a.clone());
        journal.record_removed("UGONE");
        journal.record_added(b.clone());

        assert_eq!(journal.added().cloned().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(journal.removed().collect::<Vec<_>>(), vec!["UGONE"]);

        journal.clear_added();
        assert_eq!(journal.len(), 1);
        journal.clear_removed();
        assert!(journal.is_empty());
    }

    #[test]
    fn test_remove_cancels_pending_add() {
        let a = KeyPair::generate(KeyRole::Account);
        let mut journal = KeyJournal::new();
        journal.record_added(a.clone());
        journal.record_removed(a.public_key());

        let public = a.public_key();
        assert_eq!(journal.added().count(), 0);
        assert_eq!(journal.removed().collect::<Vec<_>>(), vec![public.as_str()]);
    }

    #[test]
    fn test_readd_cancels_pending_remove() {
        let a = KeyPair::generate(KeyRole::Account);
        let mut journal = KeyJournal::new();
        journal.record_removed(a.public_key());
        journal.record_added(a.clone());

        assert_eq!(journal.removed().count(), 0);
        assert_eq!(journal.entries(), &[KeyChange::Added(a)]);
    }

    #[test]
    fn test_duplicate_removals_collapse() {
        let mut journal = KeyJournal::new();
        journal.record_removed("UX");
        journal.record_removed("UX");
        assert_eq!(journal.len(), 1);
    }
}
