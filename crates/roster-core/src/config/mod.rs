//! Provider configuration
//!
//! Precedence, lowest first: built-in defaults, the TOML file, `ROSTER_*`
//! environment variables, command-line flags.

mod traits;

pub use traits::{ConfigDefaults, ConfigMerge, ConfigValidation, RosterConfig};

use crate::errors::{Result, RosterError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`ProviderConfig::stores_dir`]
pub const STORES_DIR_ENV: &str = "ROSTER_STORES_DIR";
/// Environment variable overriding [`ProviderConfig::keys_dir`]
pub const KEYS_DIR_ENV: &str = "ROSTER_KEYS_DIR";

/// Where the directory provider keeps claims and keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Root of the claim store; one sub-directory per operator
    pub stores_dir: PathBuf,
    /// Root of the key vaults; one sub-directory per operator
    pub keys_dir: PathBuf,
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roster")
}

impl ConfigDefaults for ProviderConfig {
    fn defaults() -> Self {
        let root = data_root();
        Self {
            stores_dir: root.join("stores"),
            keys_dir: root.join("keys"),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        <Self as ConfigDefaults>::defaults()
    }
}

impl ProviderConfig {
    /// Configuration rooted at explicit directories
    pub fn new(stores_dir: impl Into<PathBuf>, keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            stores_dir: stores_dir.into(),
            keys_dir: keys_dir.into(),
        }
    }

    /// Defaults, then `path` if given, then the environment; validated
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }
}

impl RosterConfig for ProviderConfig {
    fn merge_with_env(&mut self) -> Result<()> {
        if let Some(dir) = std::env::var_os(STORES_DIR_ENV) {
            self.stores_dir = PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os(KEYS_DIR_ENV) {
            self.keys_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "stores" | "stores_dir" | "stores-dir" => self.stores_dir = PathBuf::from(value),
            "keys" | "keys_dir" | "keys-dir" => self.keys_dir = PathBuf::from(value),
            _ => {
                return Err(RosterError::invalid(format!(
                    "Unknown configuration key: {key}"
                )))
            }
        }
        Ok(())
    }
}

impl ConfigMerge for ProviderConfig {
    fn merge_with(&mut self, other: &Self) -> Result<()> {
        let defaults = Self::default();
        if other.stores_dir != defaults.stores_dir {
            self.stores_dir = other.stores_dir.clone();
        }
        if other.keys_dir != defaults.keys_dir {
            self.keys_dir = other.keys_dir.clone();
        }
        Ok(())
    }
}

impl ConfigValidation for ProviderConfig {
    fn validate(&self) -> Result<()> {
        if self.stores_dir.as_os_str().is_empty() {
            return Err(RosterError::invalid("stores_dir cannot be empty"));
        }
        if self.keys_dir.as_os_str().is_empty() {
            return Err(RosterError::invalid("keys_dir cannot be empty"));
        }
        if self.stores_dir == self.keys_dir {
            return Err(RosterError::invalid(
                "stores_dir and keys_dir must be different directories",
            ));
        }
        Ok(())
    }
}
