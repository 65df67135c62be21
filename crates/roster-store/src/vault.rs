//! Directory-backed key vaults, one directory of seed files per operator

use roster_core::keys::parse_public_key;
use roster_core::tree::validate_name;
use roster_core::{KeyPair, KeyVault, KeyVaults, Result, RosterError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::fs_util::{create_private_dir, file_stem_with, io_error, list_sorted, write_atomic};

/// File extension of stored seeds
pub const KEY_EXTENSION: &str = "nk";

/// Opens per-operator vault directories under one root
#[derive(Debug, Clone)]
pub struct DirectoryKeyVaults {
    root: PathBuf,
}

impl DirectoryKeyVaults {
    /// Vaults rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Vault root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl KeyVaults for DirectoryKeyVaults {
    type Vault = DirectoryKeyVault;

    fn open(&self, operator: &str) -> Result<DirectoryKeyVault> {
        validate_name(operator)?;
        let dir = self.root.join(operator);
        if !dir.is_dir() {
            create_private_dir(&dir)?;
            info!(operator = %operator, "Initialized key vault at {:?}", dir);
        }
        Ok(DirectoryKeyVault { dir })
    }
}

/// One operator's keys: a `<PUBLIC>.nk` file per key holding its seed
#[derive(Debug, Clone)]
pub struct DirectoryKeyVault {
    dir: PathBuf,
}

impl DirectoryKeyVault {
    fn key_path(&self, public: &str) -> Result<PathBuf> {
        parse_public_key(public)?;
        Ok(self.dir.join(format!("{public}.{KEY_EXTENSION}")))
    }

    /// Public keys of every stored key pair, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        list_sorted(&self.dir, |entry| file_stem_with(entry, KEY_EXTENSION))
    }
}

impl KeyVault for DirectoryKeyVault {
    fn get_key_pair(&self, public: &str) -> Result<Option<KeyPair>> {
        let path = self.key_path(public)?;
        let seed = match fs::read_to_string(&path) {
            Ok(seed) => Zeroizing::new(seed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read key", &path, e)),
        };
        let pair = KeyPair::from_seed(seed.trim())?;
        if pair.public_key() != public {
            return Err(RosterError::crypto(format!(
                "key file {} holds a different key",
                path.display()
            )));
        }
        Ok(Some(pair))
    }

    fn store_key_pair(&self, pair: &KeyPair) -> Result<String> {
        let public = pair.public_key();
        let path = self.key_path(&public)?;
        write_atomic(&path, pair.seed().as_bytes())?;
        debug!(public = %public, "stored key");
        Ok(public)
    }

    fn remove_key_pair(&self, public: &str) -> Result<()> {
        let path = self.key_path(public)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(public = %public, "removed key");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove key", &path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use roster_core::KeyRole;

    #[test]
    fn test_store_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let vault = DirectoryKeyVaults::new(dir.path()).open("O").unwrap();
        let pair = KeyPair::generate(KeyRole::Account);
        let public = vault.store_key_pair(&pair).unwrap();

        assert_eq!(vault.get_key_pair(&public).unwrap(), Some(pair));
        assert_eq!(vault.list().unwrap(), vec![public.clone()]);

        vault.remove_key_pair(&public).unwrap();
        assert_eq!(vault.get_key_pair(&public).unwrap(), None);
        vault.remove_key_pair(&public).unwrap();
    }

    #[test]
    fn test_vaults_are_per_operator() {
        let dir = tempfile::tempdir().unwrap();
        let vaults = DirectoryKeyVaults::new(dir.path());
        let pair = KeyPair::generate(KeyRole::User);
        vaults.open("O1").unwrap().store_key_pair(&pair).unwrap();
        assert!(vaults
            .open("O2")
            .unwrap()
            .get_key_pair(&pair.public_key())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_mismatched_key_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let vault = DirectoryKeyVaults::new(dir.path()).open("O").unwrap();
        let a = KeyPair::generate(KeyRole::User);
        let b = KeyPair::generate(KeyRole::User);
        fs::write(
            dir.path().join("O").join(format!("{}.nk", a.public_key())),
            b.seed().as_bytes(),
        )
        .unwrap();
        assert_matches!(vault.get_key_pair(&a.public_key()), Err(RosterError::Crypto { .. }));
    }

    #[test]
    fn test_malformed_public_key_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let vault = DirectoryKeyVaults::new(dir.path()).open("O").unwrap();
        assert!(vault.get_key_pair("../../etc/passwd").is_err());
    }
}
