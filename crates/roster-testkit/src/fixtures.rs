//! Tree fixtures
//!
//! Trees are built through the public mutation API, so every node is new and
//! dirty and every key is in the operator's journal, exactly as if a caller
//! had created them by hand.

use roster_core::{OperatorNode, Tracked};
use serde_json::json;

/// Operator with the given accounts, each holding the given users
pub fn operator_with(name: &str, accounts: &[(&str, &[&str])]) -> OperatorNode {
    let mut operator = OperatorNode::create(name).expect("operator fixture");
    for (account, users) in accounts {
        let mut editor = operator.add_account(account).expect("account fixture");
        for user in *users {
            editor.add_user(user, None).expect("user fixture");
        }
    }
    operator
}

/// Operator "O" with account "A" holding user "U"
pub fn single_user_operator() -> OperatorNode {
    operator_with("O", &[("A", &["U"])])
}

/// Operator "O" with account "A" that has an unscoped signing key, a scoped
/// signing key for role "admin", and one user issued by each of the three
/// account keys: "plain" (account key), "signed" (signing key) and "scoped"
pub fn mixed_signer_operator() -> OperatorNode {
    let mut operator = OperatorNode::create("O").expect("operator fixture");
    let mut account = operator.add_account("A").expect("account fixture");
    let signing = account.add_signing_key().expect("signing key fixture");
    let scope = account
        .add_scope("admin", json!({ "pub": { "allow": ["admin.>"] } }))
        .expect("scope fixture");
    account.add_user("plain", None).expect("user fixture");
    account.add_user("signed", Some(&signing)).expect("user fixture");
    account.add_user("scoped", Some(&scope)).expect("user fixture");
    operator
}

/// Total number of nodes in a tree
pub fn node_count(operator: &OperatorNode) -> usize {
    1 + operator
        .accounts
        .iter()
        .map(|a| 1 + a.users.len())
        .sum::<usize>()
}

/// True if no node in the tree is dirty
pub fn all_synced(operator: &OperatorNode) -> bool {
    !operator.is_dirty()
        && operator
            .accounts
            .iter()
            .all(|a| !a.is_dirty() && a.users.iter().all(|u| !u.is_dirty()))
}
