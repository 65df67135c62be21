//! Commands run end to end against a directory store

use clap::Parser;
use roster_cli::{commands, Cli};
use roster_sync::{Auth, DirectoryProvider};

fn run(dir: &tempfile::TempDir, args: &[&str]) -> Auth<DirectoryProvider> {
    let stores = dir.path().join("stores");
    let keys = dir.path().join("keys");
    let mut argv = vec![
        "roster",
        "--stores",
        stores.to_str().unwrap(),
        "--keys",
        keys.to_str().unwrap(),
    ];
    argv.extend_from_slice(args);
    let cli = Cli::parse_from(argv);

    let config = cli.provider_config().unwrap();
    let mut auth = Auth::new(DirectoryProvider::from_config(&config).unwrap()).unwrap();
    commands::run(&mut auth, &cli.command).unwrap();
    if cli.command.is_mutating() {
        auth.commit().unwrap();
    }
    auth
}

#[test]
fn test_build_and_prune_a_tree() {
    let dir = tempfile::tempdir().unwrap();
    run(&dir, &["add-operator", "O"]);
    run(&dir, &["add-account", "-o", "O", "A"]);
    run(&dir, &["add-scope", "-o", "O", "-a", "A", "-t", r#"{"subs":1}"#, "ops"]);
    run(&dir, &["add-user", "-o", "O", "-a", "A", "U"]);
    run(&dir, &["add-user", "-o", "O", "-a", "A", "--scope", "ops", "S"]);

    let auth = run(&dir, &["list"]);
    let account = auth.operator("O").unwrap().account("A").unwrap();
    assert_eq!(account.users.len(), 2);
    assert!(account.user("S").unwrap().edits_rejected);
    assert!(!account.user("U").unwrap().edits_rejected);

    run(&dir, &["delete-user", "-o", "O", "-a", "A", "U"]);
    let auth = run(&dir, &["list", "O"]);
    assert!(auth.operator("O").unwrap().account("A").unwrap().user("U").is_none());

    run(&dir, &["delete-account", "-o", "O", "A"]);
    let auth = run(&dir, &["list"]);
    assert!(auth.operator("O").unwrap().accounts.is_empty());
    assert!(!dir.path().join("stores/O/accounts/A").exists());
}
