//! Claim payloads for operators, accounts and users
//!
//! Only the fields the tree needs are typed: subject, issuer, issued-at,
//! signing-key lists and the issuing account of a user. Everything else
//! in the type-specific section is carried in `extra` and written back
//! untouched, so limits, permissions and other policy stay opaque here.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Current payload version
pub const CLAIM_VERSION: u8 = 2;

/// Discriminator stored in every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    /// Operator claim
    Operator,
    /// Account claim
    Account,
    /// User claim
    User,
}

/// Type-specific section of a claim
pub trait ClaimFields: Serialize + DeserializeOwned + Clone + Debug + Default {
    /// The type tag this section must carry
    const TYPE: ClaimType;

    /// The type tag actually present in the payload
    fn claim_type(&self) -> ClaimType;
}

/// A signed, timestamped identity assertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims<T> {
    /// Content hash, filled in by the codec on encode
    #[serde(default)]
    pub jti: String,
    /// Issued-at, seconds since the Unix epoch
    pub iat: i64,
    /// Public identifier of the signing key
    pub iss: String,
    /// Public identifier of the entity this claim describes
    pub sub: String,
    /// Entity name
    #[serde(default)]
    pub name: String,
    /// Optional expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Type-specific section
    pub nats: T,
}

impl<T: ClaimFields> Claims<T> {
    /// New unsigned claim
    pub fn new(
        name: impl Into<String>,
        subject: impl Into<String>,
        issuer: impl Into<String>,
        issued_at: i64,
    ) -> Self {
        Self {
            jti: String::new(),
            iat: issued_at,
            iss: issuer.into(),
            sub: subject.into(),
            name: name.into(),
            exp: None,
            nats: T::default(),
        }
    }

    /// Subject public identifier
    pub fn subject(&self) -> &str {
        &self.sub
    }

    /// Issuer public identifier
    pub fn issuer(&self) -> &str {
        &self.iss
    }

    /// Issued-at timestamp
    pub fn issued_at(&self) -> i64 {
        self.iat
    }
}

/// Operator section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorFields {
    /// Operator signing keys, by public identifier
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signing_keys: Vec<String>,
    /// Type tag
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    /// Payload version
    pub version: u8,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for OperatorFields {
    fn default() -> Self {
        Self {
            signing_keys: Vec::new(),
            claim_type: ClaimType::Operator,
            version: CLAIM_VERSION,
            extra: BTreeMap::new(),
        }
    }
}

impl ClaimFields for OperatorFields {
    const TYPE: ClaimType = ClaimType::Operator;

    fn claim_type(&self) -> ClaimType {
        self.claim_type
    }
}

/// A signing key bound to a permission template
///
/// Users issued by a scoped key take their permissions from the template,
/// so their own claims are not edited directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserScope {
    /// Always `user_scope`
    pub kind: String,
    /// Public identifier of the scoped signing key
    pub key: String,
    /// Role name used to look the scope up
    #[serde(default)]
    pub role: String,
    /// Opaque permission template
    #[serde(default)]
    pub template: Value,
    /// Optional human description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl UserScope {
    /// Kind tag for user scopes
    pub const KIND: &'static str = "user_scope";

    /// New scope for `key`
    pub fn new(key: impl Into<String>, role: impl Into<String>, template: Value) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            key: key.into(),
            role: role.into(),
            template,
            description: String::new(),
        }
    }
}

/// Wire form of one account signing key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SigningKeyEntry {
    /// Unscoped key, written as its bare identifier
    Plain(String),
    /// Key bound to a scope
    Scoped(UserScope),
}

/// Account signing keys, each optionally scoped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SigningKeyEntry>", into = "Vec<SigningKeyEntry>")]
pub struct SigningKeys(BTreeMap<String, Option<UserScope>>);

impl From<Vec<SigningKeyEntry>> for SigningKeys {
    fn from(entries: Vec<SigningKeyEntry>) -> Self {
        let mut keys = BTreeMap::new();
        for entry in entries {
            match entry {
                SigningKeyEntry::Plain(key) => {
                    keys.insert(key, None);
                }
                SigningKeyEntry::Scoped(scope) => {
                    keys.insert(scope.key.clone(), Some(scope));
                }
            }
        }
        Self(keys)
    }
}

impl From<SigningKeys> for Vec<SigningKeyEntry> {
    fn from(keys: SigningKeys) -> Self {
        keys.0
            .into_iter()
            .map(|(key, scope)| match scope {
                Some(scope) => SigningKeyEntry::Scoped(scope),
                None => SigningKeyEntry::Plain(key),
            })
            .collect()
    }
}

impl SigningKeys {
    /// All signing key identifiers, in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Add an unscoped key; replaces any scope previously attached
    pub fn add(&mut self, key: impl Into<String>) {
        self.0.insert(key.into(), None);
    }

    /// Add a scoped key
    pub fn add_scope(&mut self, scope: UserScope) {
        self.0.insert(scope.key.clone(), Some(scope));
    }

    /// Remove a key, returning whether it was present
    pub fn remove(&mut self, key: &str) -> bool {
        self.0.remove(key).is_some()
    }

    /// True if `key` is listed, scoped or not
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True if `key` is listed and carries a scope
    pub fn is_scoped(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(Some(_)))
    }

    /// Scope attached to `key`
    pub fn scope(&self, key: &str) -> Option<&UserScope> {
        self.0.get(key).and_then(Option::as_ref)
    }

    /// First scope whose role matches
    pub fn scope_by_role(&self, role: &str) -> Option<&UserScope> {
        self.0.values().flatten().find(|s| s.role == role)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no keys
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Account section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFields {
    /// Account signing keys
    #[serde(default, skip_serializing_if = "SigningKeys::is_empty")]
    pub signing_keys: SigningKeys,
    /// Type tag
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    /// Payload version
    pub version: u8,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for AccountFields {
    fn default() -> Self {
        Self {
            signing_keys: SigningKeys::default(),
            claim_type: ClaimType::Account,
            version: CLAIM_VERSION,
            extra: BTreeMap::new(),
        }
    }
}

impl ClaimFields for AccountFields {
    const TYPE: ClaimType = ClaimType::Account;

    fn claim_type(&self) -> ClaimType {
        self.claim_type
    }
}

/// User section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFields {
    /// Account subject, present when the user was issued by a signing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_account: Option<String>,
    /// Type tag
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    /// Payload version
    pub version: u8,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for UserFields {
    fn default() -> Self {
        Self {
            issuer_account: None,
            claim_type: ClaimType::User,
            version: CLAIM_VERSION,
            extra: BTreeMap::new(),
        }
    }
}

impl ClaimFields for UserFields {
    const TYPE: ClaimType = ClaimType::User;

    fn claim_type(&self) -> ClaimType {
        self.claim_type
    }
}

/// Operator claim
pub type OperatorClaim = Claims<OperatorFields>;
/// Account claim
pub type AccountClaim = Claims<AccountFields>;
/// User claim
pub type UserClaim = Claims<UserFields>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signing_keys_accept_plain_and_scoped_entries() {
        let raw = json!([
            "AKEYONE",
            {"kind": "user_scope", "key": "AKEYTWO", "role": "admin", "template": {"subs": 10}}
        ]);
        let keys: SigningKeys = serde_json::from_value(raw).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(!keys.is_scoped("AKEYONE"));
        assert!(keys.is_scoped("AKEYTWO"));
        assert_eq!(keys.scope_by_role("admin").unwrap().key, "AKEYTWO");
        assert!(keys.scope_by_role("nobody").is_none());
    }

    #[test]
    fn test_unknown_fields_survive_reserialization() {
        let raw = json!({
            "jti": "x",
            "iat": 10,
            "iss": "OISS",
            "sub": "ASUB",
            "name": "A",
            "nats": {
                "type": "account",
                "version": 2,
                "limits": {"conn": 5},
                "exports": []
            }
        });
        let claim: AccountClaim = serde_json::from_value(raw).unwrap();
        assert_eq!(claim.nats.extra.get("limits"), Some(&json!({"conn": 5})));

        let back = serde_json::to_value(&claim).unwrap();
        assert_eq!(back["nats"]["limits"], json!({"conn": 5}));
        assert_eq!(back["nats"]["exports"], json!([]));
        assert!(back["nats"].get("signing_keys").is_none());
    }

    #[test]
    fn test_type_tag_is_read_from_payload() {
        let raw = json!({
            "iat": 1, "iss": "O", "sub": "U",
            "nats": {"type": "user", "version": 2}
        });
        let claim: OperatorClaim = serde_json::from_value(raw).unwrap();
        assert_eq!(claim.nats.claim_type(), ClaimType::User);
        assert_ne!(claim.nats.claim_type(), OperatorFields::TYPE);
    }
}
