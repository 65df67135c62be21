//! End-to-end load/store over real directories

use assert_matches::assert_matches;
use roster_core::{IdentityProvider, OperatorNode, ProviderConfig, RosterError};
use roster_store::MARKER_FILE;
use roster_sync::{Auth, DirectoryProvider};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn provider(dir: &TempDir) -> DirectoryProvider {
    let config = ProviderConfig::new(dir.path().join("stores"), dir.path().join("keys"));
    DirectoryProvider::from_config(&config).unwrap()
}

fn key_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0)
}

#[test]
fn test_fresh_operator_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let provider = provider(&dir);

    assert!(provider.load().unwrap().is_empty());
    assert!(dir.path().join("stores").is_dir());

    let mut operators = vec![OperatorNode::create("O").unwrap()];
    provider.store(&mut operators).unwrap();

    let stores = dir.path().join("stores");
    assert!(stores.join("O").join(MARKER_FILE).is_file());
    assert!(stores.join("O").join("O.jwt").is_file());
    assert_eq!(key_files(&dir.path().join("keys").join("O")), 1);

    let loaded = provider.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "O");
    assert!(loaded[0].accounts.is_empty());
    assert_eq!(loaded[0].token, operators[0].token);
}

#[test]
fn test_delete_user_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let mut auth = Auth::new(provider(&dir)).unwrap();
    auth.add_operator("O")
        .unwrap()
        .add_account("A")
        .unwrap()
        .add_user("U", None)
        .unwrap();
    auth.commit().unwrap();
    let user_file = dir.path().join("stores/O/accounts/A/users/U.jwt");
    assert!(user_file.is_file());
    assert_eq!(key_files(&dir.path().join("keys/O")), 3);

    let mut auth = Auth::new(provider(&dir)).unwrap();
    assert!(auth
        .operator_mut("O")
        .unwrap()
        .account_mut("A")
        .unwrap()
        .delete_user("U"));
    auth.commit().unwrap();

    assert!(!user_file.exists());
    assert_eq!(key_files(&dir.path().join("keys/O")), 2);
    auth.reload().unwrap();
    assert!(auth.operator("O").unwrap().account("A").unwrap().users.is_empty());
}

#[test]
fn test_delete_account_removes_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut auth = Auth::new(provider(&dir)).unwrap();
    {
        let operator = auth.add_operator("O").unwrap();
        operator.add_account("A").unwrap().add_user("U", None).unwrap();
        operator.add_account("B").unwrap();
    }
    auth.commit().unwrap();
    auth.reload().unwrap();

    assert!(auth.operator_mut("O").unwrap().delete_account("A"));
    auth.commit().unwrap();

    assert!(!dir.path().join("stores/O/accounts/A").exists());
    assert!(dir.path().join("stores/O/accounts/B/B.jwt").is_file());
    auth.reload().unwrap();
    let names: Vec<_> = auth.operator("O").unwrap().accounts.iter().map(|a| a.name.clone()).collect();
    assert_eq!(names, vec!["B".to_string()]);
}

#[test]
fn test_half_created_operator_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let provider = provider(&dir);
    provider.load().unwrap();
    fs::create_dir_all(dir.path().join("stores/ghost/accounts")).unwrap();

    assert!(provider.load().unwrap().is_empty());
}

#[test]
fn test_badly_named_entries_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let provider = provider(&dir);
    let mut operators = vec![OperatorNode::create("O").unwrap()];
    provider.store(&mut operators).unwrap();
    fs::create_dir_all(dir.path().join("stores/backup..old")).unwrap();
    fs::create_dir_all(dir.path().join("stores/O/accounts/old..A")).unwrap();

    let loaded = provider.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].accounts.is_empty());
}

#[test]
fn test_creation_interrupted_by_vault_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let provider = provider(&dir);
    let keys = dir.path().join("keys");
    fs::write(&keys, b"not a directory").unwrap();

    let mut operators = vec![OperatorNode::create("O").unwrap()];
    operators[0].add_account("A").unwrap();
    assert!(provider.store(&mut operators).is_err());
    fs::remove_file(&keys).unwrap();

    let partial = provider.load().unwrap();
    assert_eq!(partial.len(), 1);
    assert!(partial[0].key.is_none());

    provider.store(&mut operators).unwrap();

    let loaded = provider.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].key.is_some());
    assert!(loaded[0].account("A").unwrap().key.is_some());
    assert_eq!(key_files(&keys.join("O")), 2);
}

#[test]
fn test_tampered_claim_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let provider = provider(&dir);
    let mut operators = vec![OperatorNode::create("O").unwrap()];
    provider.store(&mut operators).unwrap();

    let path = dir.path().join("stores/O/O.jwt");
    let token = fs::read_to_string(&path).unwrap();
    let mut parts: Vec<&str> = token.split('.').collect();
    parts[2] = "AAAA";
    fs::write(&path, parts.join(".")).unwrap();

    assert_matches!(provider.load(), Err(RosterError::Decode { .. }));
}

#[test]
fn test_second_commit_leaves_files_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut auth = Auth::new(provider(&dir)).unwrap();
    auth.add_operator("O")
        .unwrap()
        .add_account("A")
        .unwrap()
        .add_user("U", None)
        .unwrap();
    auth.commit().unwrap();

    let path = dir.path().join("stores/O/accounts/A/users/U.jwt");
    let before = fs::metadata(&path).unwrap().modified().unwrap();
    fs::remove_file(dir.path().join("stores/O/O.jwt")).unwrap();

    auth.commit().unwrap();
    assert!(!dir.path().join("stores/O/O.jwt").exists());
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
}
