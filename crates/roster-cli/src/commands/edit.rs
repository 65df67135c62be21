//! Tree edits

use anyhow::Context;
use roster_core::IdentityProvider;
use roster_sync::Auth;
use serde_json::Value;
use tracing::info;

use super::operator_mut;

/// Create an operator and return its public key
pub fn add_operator<P: IdentityProvider>(auth: &mut Auth<P>, name: &str) -> anyhow::Result<String> {
    let operator = auth.add_operator(name)?;
    info!(operator = %name, "operator created");
    Ok(operator.public_key().to_string())
}

/// Create an account and return its public key
pub fn add_account<P: IdentityProvider>(
    auth: &mut Auth<P>,
    operator: &str,
    name: &str,
) -> anyhow::Result<String> {
    let editor = operator_mut(auth, operator)?.add_account(name)?;
    info!(operator = %operator, account = %name, "account created");
    Ok(editor.public_key().to_string())
}

/// Create a user, issued by the account key or by the scoped key of `scope`,
/// and return its public key
pub fn add_user<P: IdentityProvider>(
    auth: &mut Auth<P>,
    operator: &str,
    account: &str,
    name: &str,
    scope: Option<&str>,
) -> anyhow::Result<String> {
    let mut editor = operator_mut(auth, operator)?
        .account_mut(account)
        .with_context(|| format!("no account named {account} in operator {operator}"))?;

    let signer = match scope {
        Some(role) => Some(
            editor
                .node()
                .claim
                .nats
                .signing_keys
                .scope_by_role(role)
                .map(|s| s.key.clone())
                .with_context(|| format!("account {account} has no scope {role:?}"))?,
        ),
        None => None,
    };
    let user = editor.add_user(name, signer.as_deref())?;
    info!(account = %account, user = %name, scoped = user.edits_rejected, "user created");
    Ok(user.public_key().to_string())
}

/// Add a scoped signing key for `role` and return its public key
pub fn add_scope<P: IdentityProvider>(
    auth: &mut Auth<P>,
    operator: &str,
    account: &str,
    role: &str,
    template: &str,
) -> anyhow::Result<String> {
    let template: Value = serde_json::from_str(template).context("template is not valid JSON")?;
    let mut editor = operator_mut(auth, operator)?
        .account_mut(account)
        .with_context(|| format!("no account named {account} in operator {operator}"))?;
    let public = editor.add_scope(role, template)?;
    info!(account = %account, role = %role, "scope created");
    Ok(public)
}

/// Delete a user
pub fn delete_user<P: IdentityProvider>(
    auth: &mut Auth<P>,
    operator: &str,
    account: &str,
    name: &str,
) -> anyhow::Result<()> {
    let mut editor = operator_mut(auth, operator)?
        .account_mut(account)
        .with_context(|| format!("no account named {account} in operator {operator}"))?;
    anyhow::ensure!(editor.delete_user(name), "no user named {name} in account {account}");
    info!(account = %account, user = %name, "user deleted");
    Ok(())
}

/// Delete an account with its users
pub fn delete_account<P: IdentityProvider>(
    auth: &mut Auth<P>,
    operator: &str,
    name: &str,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        operator_mut(auth, operator)?.delete_account(name),
        "no account named {name} in operator {operator}"
    );
    info!(operator = %operator, account = %name, "account deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use roster_core::RosterError;
    use roster_sync::Provider;
    use roster_testkit::{MemoryKeyVaults, MemoryStore};

    fn auth() -> Auth<Provider<MemoryStore, MemoryKeyVaults>> {
        Auth::new(Provider::new(MemoryStore::new(), MemoryKeyVaults::new())).unwrap()
    }

    #[test]
    fn test_scoped_user_via_role() {
        let mut auth = auth();
        add_operator(&mut auth, "O").unwrap();
        add_account(&mut auth, "O", "A").unwrap();
        let scope = add_scope(&mut auth, "O", "A", "admin", r#"{"subs": 5}"#).unwrap();
        add_user(&mut auth, "O", "A", "U", Some("admin")).unwrap();

        let user = auth.operator("O").unwrap().account("A").unwrap().user("U").unwrap();
        assert_eq!(user.issuer(), scope);
        assert!(user.edits_rejected);
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let mut auth = auth();
        assert!(add_account(&mut auth, "nope", "A").is_err());
        add_operator(&mut auth, "O").unwrap();
        assert!(add_user(&mut auth, "O", "A", "U", None).is_err());
        add_account(&mut auth, "O", "A").unwrap();
        assert!(add_user(&mut auth, "O", "A", "U", Some("missing")).is_err());
        assert!(delete_user(&mut auth, "O", "A", "U").is_err());
        assert!(add_scope(&mut auth, "O", "A", "r", "{not json").is_err());
    }

    #[test]
    fn test_duplicate_account_keeps_error_variant() {
        let mut auth = auth();
        add_operator(&mut auth, "O").unwrap();
        add_account(&mut auth, "O", "A").unwrap();
        let err = add_account(&mut auth, "O", "A").unwrap_err();
        assert_matches!(
            err.downcast_ref::<RosterError>(),
            Some(RosterError::AlreadyExists { .. })
        );
    }

    #[test]
    fn test_delete_account() {
        let mut auth = auth();
        add_operator(&mut auth, "O").unwrap();
        add_account(&mut auth, "O", "A").unwrap();
        delete_account(&mut auth, "O", "A").unwrap();
        assert!(delete_account(&mut auth, "O", "A").is_err());
        assert!(auth.operator("O").unwrap().accounts.is_empty());
    }
}
