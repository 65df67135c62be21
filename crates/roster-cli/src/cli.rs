use anyhow::Context;
use clap::{Parser, Subcommand};
use roster_core::{ConfigValidation, ProviderConfig, RosterConfig};
use std::path::PathBuf;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "roster")]
#[command(about = "Roster - operator, account and user identity store", long_about = None)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Claim store directory, overrides config and ROSTER_STORES_DIR
    #[arg(long, global = true)]
    pub stores: Option<PathBuf>,

    /// Key vault directory, overrides config and ROSTER_KEYS_DIR
    #[arg(long, global = true)]
    pub keys: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the operator/account/user tree
    List {
        /// Only this operator
        operator: Option<String>,
    },

    /// Create an operator
    AddOperator {
        /// Operator name
        name: String,
    },

    /// Create an account under an operator
    AddAccount {
        /// Operator name
        #[arg(short, long)]
        operator: String,

        /// Account name
        name: String,
    },

    /// Create a user under an account
    AddUser {
        /// Operator name
        #[arg(short, long)]
        operator: String,

        /// Account name
        #[arg(short, long)]
        account: String,

        /// Issue with the scoped signing key of this role
        #[arg(short, long)]
        scope: Option<String>,

        /// User name
        name: String,
    },

    /// Add a scoped signing key to an account
    AddScope {
        /// Operator name
        #[arg(short, long)]
        operator: String,

        /// Account name
        #[arg(short, long)]
        account: String,

        /// Permission template as JSON
        #[arg(short, long, default_value = "{}")]
        template: String,

        /// Scope role
        role: String,
    },

    /// Delete a user
    DeleteUser {
        /// Operator name
        #[arg(short, long)]
        operator: String,

        /// Account name
        #[arg(short, long)]
        account: String,

        /// User name
        name: String,
    },

    /// Delete an account with all of its users
    DeleteAccount {
        /// Operator name
        #[arg(short, long)]
        operator: String,

        /// Account name
        name: String,
    },
}

impl Commands {
    /// True if the command changes the store
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Commands::List { .. })
    }
}

impl Cli {
    /// Defaults, config file, environment, then flags
    pub fn provider_config(&self) -> anyhow::Result<ProviderConfig> {
        let mut config = match &self.config {
            Some(path) => ProviderConfig::load_from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ProviderConfig::default(),
        };
        config.merge_with_env()?;
        if let Some(stores) = &self.stores {
            config.stores_dir = stores.clone();
        }
        if let Some(keys) = &self.keys {
            config.keys_dir = keys.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_user_with_scope() {
        let cli = Cli::parse_from([
            "roster", "--stores", "/s", "add-user", "-o", "O", "-a", "A", "--scope", "admin", "U",
        ]);
        assert_eq!(cli.stores, Some(PathBuf::from("/s")));
        match cli.command {
            Commands::AddUser {
                operator,
                account,
                scope,
                name,
            } => {
                assert_eq!((operator.as_str(), account.as_str(), name.as_str()), ("O", "A", "U"));
                assert_eq!(scope.as_deref(), Some("admin"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["roster", "--stores", "/s", "--keys", "/k", "list"]);
        let config = cli.provider_config().unwrap();
        assert_eq!(config, ProviderConfig::new("/s", "/k"));
        assert!(!cli.command.is_mutating());
    }
}
