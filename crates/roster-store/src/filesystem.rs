//! Directory-backed claim store
//!
//! One directory per operator under the store root. An operator becomes
//! visible only once its `.roster` marker is written, which happens after
//! its claim. Entries whose names could not have been produced by this
//! store are skipped when listing.

use roster_core::tree::validate_name;
use roster_core::{KeyPair, Result, RosterError, StoreBackend};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::fs_util::{
    create_private_dir, dir_name, file_stem_with, io_error, list_sorted, write_atomic,
};

/// Marker file whose presence makes an operator container visible
pub const MARKER_FILE: &str = ".roster";

const CLAIM_EXTENSION: &str = "jwt";
const ACCOUNTS_DIR: &str = "accounts";
const USERS_DIR: &str = "users";

/// Contents of the operator marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorMarker {
    /// Operator name
    pub name: String,
    /// Public key of the owning operator key
    pub operator: String,
}

/// Claim store rooted at one directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Store rooted at `root`; nothing is touched until [`StoreBackend::ensure_root`]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn operator_dir(&self, operator: &str) -> Result<PathBuf> {
        validate_name(operator)?;
        Ok(self.root.join(operator))
    }

    fn account_dir(&self, operator: &str, account: &str) -> Result<PathBuf> {
        validate_name(account)?;
        Ok(self.operator_dir(operator)?.join(ACCOUNTS_DIR).join(account))
    }

    fn operator_claim_path(&self, operator: &str) -> Result<PathBuf> {
        Ok(self
            .operator_dir(operator)?
            .join(format!("{operator}.{CLAIM_EXTENSION}")))
    }

    fn account_claim_path(&self, operator: &str, account: &str) -> Result<PathBuf> {
        Ok(self
            .account_dir(operator, account)?
            .join(format!("{account}.{CLAIM_EXTENSION}")))
    }

    fn user_claim_path(&self, operator: &str, account: &str, user: &str) -> Result<PathBuf> {
        validate_name(user)?;
        Ok(self
            .account_dir(operator, account)?
            .join(USERS_DIR)
            .join(format!("{user}.{CLAIM_EXTENSION}")))
    }

    /// Parsed marker of a materialized operator
    pub fn read_marker(&self, operator: &str) -> Result<OperatorMarker> {
        let path = self.operator_dir(operator)?.join(MARKER_FILE);
        let content = fs::read(&path).map_err(|e| io_error("read", &path, e))?;
        Ok(serde_json::from_slice(&content)?)
    }

    fn read_claim(path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| io_error("read claim", path, e))
    }
}

impl StoreBackend for DirectoryStore {
    fn ensure_root(&self) -> Result<()> {
        if !self.root.is_dir() {
            create_private_dir(&self.root)?;
            info!("Initialized claim store at {:?}", self.root);
        }
        Ok(())
    }

    fn list_operators(&self) -> Result<Vec<String>> {
        let mut operators = Vec::new();
        for name in list_sorted(&self.root, dir_name)? {
            if validate_name(&name).is_err() {
                debug!(entry = %name, "skipping entry with unusable name");
            } else if self.is_materialized(&name)? {
                operators.push(name);
            } else {
                debug!(operator = %name, "skipping operator container without marker");
            }
        }
        Ok(operators)
    }

    fn is_materialized(&self, operator: &str) -> Result<bool> {
        let path = self.operator_dir(operator)?.join(MARKER_FILE);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("stat", &path, e)),
        }
    }

    fn create_operator(&self, operator: &str, owner: &KeyPair, token: &str) -> Result<()> {
        let public = owner.public_key();
        if self.is_materialized(operator)? {
            if self.read_marker(operator)?.operator != public {
                return Err(RosterError::already_exists(format!(
                    "operator {operator} already exists in {}",
                    self.root.display()
                )));
            }
            debug!(operator = %operator, "resuming operator creation");
        }
        let dir = self.operator_dir(operator)?;
        create_private_dir(&dir.join(ACCOUNTS_DIR))?;
        write_atomic(&self.operator_claim_path(operator)?, token.as_bytes())?;

        // Marker last: the container stays invisible until its claim exists
        let marker = OperatorMarker {
            name: operator.to_string(),
            operator: public,
        };
        write_atomic(&dir.join(MARKER_FILE), &serde_json::to_vec_pretty(&marker)?)?;
        info!(operator = %operator, public = %marker.operator, "created operator container");
        Ok(())
    }

    fn read_operator_claim(&self, operator: &str) -> Result<String> {
        Self::read_claim(&self.operator_claim_path(operator)?)
    }

    fn write_operator_claim(&self, operator: &str, token: &str) -> Result<()> {
        let path = self.operator_claim_path(operator)?;
        write_atomic(&path, token.as_bytes())?;
        debug!(operator = %operator, "wrote operator claim");
        Ok(())
    }

    fn list_accounts(&self, operator: &str) -> Result<Vec<String>> {
        let names = list_sorted(&self.operator_dir(operator)?.join(ACCOUNTS_DIR), dir_name)?;
        Ok(valid_names(names))
    }

    fn read_account_claim(&self, operator: &str, account: &str) -> Result<String> {
        Self::read_claim(&self.account_claim_path(operator, account)?)
    }

    fn write_account_claim(&self, operator: &str, account: &str, token: &str) -> Result<()> {
        create_private_dir(&self.account_dir(operator, account)?.join(USERS_DIR))?;
        write_atomic(&self.account_claim_path(operator, account)?, token.as_bytes())?;
        debug!(operator = %operator, account = %account, "wrote account claim");
        Ok(())
    }

    fn delete_account(&self, operator: &str, account: &str) -> Result<()> {
        let dir = self.account_dir(operator, account)?;
        fs::remove_dir_all(&dir).map_err(|e| io_error("delete account", &dir, e))?;
        debug!(operator = %operator, account = %account, "deleted account");
        Ok(())
    }

    fn list_users(&self, operator: &str, account: &str) -> Result<Vec<String>> {
        let dir = self.account_dir(operator, account)?.join(USERS_DIR);
        let names = list_sorted(&dir, |entry| file_stem_with(entry, CLAIM_EXTENSION))?;
        Ok(valid_names(names))
    }

    fn read_user_claim(&self, operator: &str, account: &str, user: &str) -> Result<String> {
        Self::read_claim(&self.user_claim_path(operator, account, user)?)
    }

    fn write_user_claim(
        &self,
        operator: &str,
        account: &str,
        user: &str,
        token: &str,
    ) -> Result<()> {
        let path = self.user_claim_path(operator, account, user)?;
        if let Some(parent) = path.parent() {
            create_private_dir(parent)?;
        }
        write_atomic(&path, token.as_bytes())?;
        debug!(operator = %operator, account = %account, user = %user, "wrote user claim");
        Ok(())
    }

    fn delete_user(&self, operator: &str, account: &str, user: &str) -> Result<()> {
        let path = self.user_claim_path(operator, account, user)?;
        fs::remove_file(&path).map_err(|e| io_error("delete user", &path, e))?;
        debug!(operator = %operator, account = %account, user = %user, "deleted user");
        Ok(())
    }
}

fn valid_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| {
            let ok = validate_name(name).is_ok();
            if !ok {
                debug!(entry = %name, "skipping entry with unusable name");
            }
            ok
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use roster_core::KeyRole;

    fn store() -> (tempfile::TempDir, DirectoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path().join("stores"));
        store.ensure_root().unwrap();
        (dir, store)
    }

    #[test]
    fn test_marker_controls_visibility() {
        let (_dir, store) = store();
        fs::create_dir_all(store.root().join("half")).unwrap();
        fs::create_dir_all(store.root().join("empty")).unwrap();
        fs::write(store.root().join("empty").join(MARKER_FILE), b"").unwrap();
        fs::create_dir_all(store.root().join("backup..old")).unwrap();

        let owner = KeyPair::generate(KeyRole::Operator);
        store.create_operator("O", &owner, "token").unwrap();

        assert_eq!(store.list_operators().unwrap(), vec!["O".to_string()]);
        assert!(!store.is_materialized("half").unwrap());
        assert!(!store.is_materialized("empty").unwrap());
        assert_eq!(store.read_marker("O").unwrap().operator, owner.public_key());
    }

    #[test]
    fn test_create_by_other_owner_is_refused() {
        let (_dir, store) = store();
        let owner = KeyPair::generate(KeyRole::Operator);
        store.create_operator("O", &owner, "t1").unwrap();
        assert_matches!(
            store.create_operator("O", &KeyPair::generate(KeyRole::Operator), "t2"),
            Err(RosterError::AlreadyExists { .. })
        );
        assert_eq!(store.read_operator_claim("O").unwrap(), "t1");
    }

    #[test]
    fn test_create_by_same_owner_resumes() {
        let (_dir, store) = store();
        let owner = KeyPair::generate(KeyRole::Operator);
        store.create_operator("O", &owner, "t1").unwrap();
        store.create_operator("O", &owner, "t2").unwrap();
        assert_eq!(store.read_operator_claim("O").unwrap(), "t2");
        assert_eq!(store.list_operators().unwrap(), vec!["O".to_string()]);
    }

    #[test]
    fn test_created_operator_has_claim_before_marker() {
        let (_dir, store) = store();
        let owner = KeyPair::generate(KeyRole::Operator);
        store.create_operator("O", &owner, "token").unwrap();
        assert!(store.is_materialized("O").unwrap());
        assert_eq!(store.read_operator_claim("O").unwrap(), "token");
    }

    #[test]
    fn test_listings_are_sorted_and_filtered() {
        let (_dir, store) = store();
        store
            .create_operator("O", &KeyPair::generate(KeyRole::Operator), "o")
            .unwrap();
        store.write_account_claim("O", "B", "b").unwrap();
        store.write_account_claim("O", "A", "a").unwrap();
        store.write_user_claim("O", "A", "zed", "z").unwrap();
        store.write_user_claim("O", "A", "amy", "y").unwrap();
        let users = store.root().join("O/accounts/A/users");
        fs::write(users.join("notes.txt"), b"x").unwrap();
        fs::write(users.join("stale.jwt.tmp"), b"x").unwrap();
        fs::write(users.join("bad..name.jwt"), b"x").unwrap();
        fs::create_dir_all(store.root().join("O/accounts/old..A")).unwrap();

        assert_eq!(store.list_accounts("O").unwrap(), vec!["A", "B"]);
        assert_eq!(store.list_users("O", "A").unwrap(), vec!["amy", "zed"]);
        assert!(store.list_users("O", "B").unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_user_is_not_found() {
        let (_dir, store) = store();
        store.write_account_claim("O", "A", "a").unwrap();
        assert_matches!(
            store.delete_user("O", "A", "ghost"),
            Err(RosterError::NotFound { .. })
        );
    }

    #[test]
    fn test_names_are_validated() {
        let (_dir, store) = store();
        assert_matches!(
            store.write_operator_claim("../escape", "x"),
            Err(RosterError::Invalid { .. })
        );
        assert_matches!(
            store.read_user_claim("O", "A", "a/b"),
            Err(RosterError::Invalid { .. })
        );
    }
}
