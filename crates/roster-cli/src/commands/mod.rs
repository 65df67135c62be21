//! Command implementations
//!
//! Each mutating command edits the in-memory tree of an [`Auth`] session;
//! the caller commits afterwards.

pub mod edit;
pub mod list;

use anyhow::Context;
use roster_core::{IdentityProvider, OperatorNode};
use roster_sync::Auth;

use crate::Commands;

/// Run `command` against `auth`, writing any output to stdout
pub fn run<P: IdentityProvider>(auth: &mut Auth<P>, command: &Commands) -> anyhow::Result<()> {
    match command {
        Commands::List { operator } => {
            print!("{}", list::render(auth.operators(), operator.as_deref())?);
        }
        Commands::AddOperator { name } => {
            let public = edit::add_operator(auth, name)?;
            println!("{public}");
        }
        Commands::AddAccount { operator, name } => {
            let public = edit::add_account(auth, operator, name)?;
            println!("{public}");
        }
        Commands::AddUser {
            operator,
            account,
            scope,
            name,
        } => {
            let public = edit::add_user(auth, operator, account, name, scope.as_deref())?;
            println!("{public}");
        }
        Commands::AddScope {
            operator,
            account,
            template,
            role,
        } => {
            let public = edit::add_scope(auth, operator, account, role, template)?;
            println!("{public}");
        }
        Commands::DeleteUser {
            operator,
            account,
            name,
        } => edit::delete_user(auth, operator, account, name)?,
        Commands::DeleteAccount { operator, name } => edit::delete_account(auth, operator, name)?,
    }
    Ok(())
}

fn operator_mut<'a, P: IdentityProvider>(
    auth: &'a mut Auth<P>,
    name: &str,
) -> anyhow::Result<&'a mut OperatorNode> {
    auth.operator_mut(name)
        .with_context(|| format!("no operator named {name}"))
}
