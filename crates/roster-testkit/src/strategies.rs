//! Property test strategies for roster trees

use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

/// Shape of a tree: account names, each with its user names
pub type TreeShape = Vec<(String, Vec<String>)>;

/// Strategy for entity names that are valid store path components
pub fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,11}"
}

/// Strategy for tree shapes with unique account names and unique user
/// names per account
pub fn arb_tree_shape() -> impl Strategy<Value = TreeShape> {
    prop::collection::btree_map(
        arb_name(),
        prop::collection::btree_set(arb_name(), 0..4),
        0..4,
    )
    .prop_map(|accounts| {
        accounts
            .into_iter()
            .map(|(account, users)| (account, users.into_iter().collect()))
            .collect()
    })
}

/// Build an operator from a generated shape
pub fn operator_from_shape(name: &str, shape: &TreeShape) -> roster_core::OperatorNode {
    let borrowed: Vec<(&str, Vec<&str>)> = shape
        .iter()
        .map(|(a, users)| (a.as_str(), users.iter().map(String::as_str).collect()))
        .collect();
    let accounts: Vec<(&str, &[&str])> = borrowed
        .iter()
        .map(|(a, users)| (*a, users.as_slice()))
        .collect();
    crate::fixtures::operator_with(name, &accounts)
}
