//! Configuration traits

use crate::errors::{Result, RosterError};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Configuration loaded from a file, then layered with the environment and
/// command-line overrides
pub trait RosterConfig: Clone + Default + DeserializeOwned {
    /// Parse a TOML file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RosterError::storage(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| RosterError::invalid(format!("Invalid TOML: {e}")))
    }

    /// Apply `ROSTER_*` environment overrides
    fn merge_with_env(&mut self) -> Result<()>;

    /// Set a single value by key (CLI overrides)
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Default values for a configuration type
pub trait ConfigDefaults {
    /// Defaults for this configuration
    fn defaults() -> Self;
}

/// Layering of one configuration over another
pub trait ConfigMerge {
    /// Take every value from `other` that differs from the defaults
    fn merge_with(&mut self, other: &Self) -> Result<()>;
}

/// Consistency checks run after all layers are applied
pub trait ConfigValidation {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;
}
