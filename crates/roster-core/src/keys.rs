//! Ed25519 key pairs with role-prefixed text encodings
//!
//! Every entity in the tree owns a key pair. The public identifier is what
//! claims refer to (issuer, subject, signing-key lists) and what the key vault
//! is addressed by; the seed is the only form in which secret material leaves
//! memory.
//!
//! Encodings:
//! - public identifier: role prefix followed by the upper-case hex verifying key
//! - seed: `S`, the role prefix, then the upper-case hex secret key

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::errors::{Result, RosterError};

const SEED_PREFIX: char = 'S';
const KEY_HEX_LEN: usize = 64;

/// Which level of the tree a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    /// Operator identity and operator signing keys
    Operator,
    /// Account identity and account signing keys
    Account,
    /// User identity
    User,
}

impl KeyRole {
    /// Prefix character used in public identifiers and seeds
    pub fn prefix(self) -> char {
        match self {
            KeyRole::Operator => 'O',
            KeyRole::Account => 'A',
            KeyRole::User => 'U',
        }
    }

    /// Inverse of [`KeyRole::prefix`]
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'O' => Some(KeyRole::Operator),
            'A' => Some(KeyRole::Account),
            'U' => Some(KeyRole::User),
            _ => None,
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Operator => write!(f, "operator"),
            KeyRole::Account => write!(f, "account"),
            KeyRole::User => write!(f, "user"),
        }
    }
}

/// Role-tagged Ed25519 key pair
///
/// Secret material is zeroized on drop by `ed25519-dalek`; [`KeyPair::seed`]
/// hands out a [`Zeroizing`] string for the same reason.
#[derive(Clone)]
pub struct KeyPair {
    role: KeyRole,
    signing: SigningKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the operating system RNG
    pub fn generate(role: KeyRole) -> Self {
        Self {
            role,
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a key pair from raw secret bytes (deterministic fixtures)
    pub fn from_secret_bytes(role: KeyRole, secret: &[u8; 32]) -> Self {
        Self {
            role,
            signing: SigningKey::from_bytes(secret),
        }
    }

    /// Parse a seed produced by [`KeyPair::seed`]
    pub fn from_seed(seed: &str) -> Result<Self> {
        let mut chars = seed.chars();
        if chars.next() != Some(SEED_PREFIX) {
            return Err(RosterError::crypto("seed must start with 'S'"));
        }
        let role = chars
            .next()
            .and_then(KeyRole::from_prefix)
            .ok_or_else(|| RosterError::crypto("seed has an unknown role prefix"))?;

        let body = &seed[2..];
        if body.len() != KEY_HEX_LEN {
            return Err(RosterError::crypto(format!(
                "seed body must be {KEY_HEX_LEN} hex characters, got {}",
                body.len()
            )));
        }
        let bytes = Zeroizing::new(
            hex::decode(body).map_err(|e| RosterError::crypto(format!("invalid seed: {e}")))?,
        );
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&bytes);
        Ok(Self::from_secret_bytes(role, &secret))
    }

    /// Role of this key
    pub fn role(&self) -> KeyRole {
        self.role
    }

    /// Public identifier
    pub fn public_key(&self) -> String {
        encode_public(self.role, &self.signing.verifying_key())
    }

    /// Seed encoding of the secret key
    pub fn seed(&self) -> Zeroizing<String> {
        let mut out = Zeroizing::new(String::with_capacity(2 + KEY_HEX_LEN));
        out.push(SEED_PREFIX);
        out.push(self.role.prefix());
        out.push_str(&Zeroizing::new(hex::encode_upper(self.signing.to_bytes())));
        out
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.role == other.role && self.signing.verifying_key() == other.signing.verifying_key()
    }
}

impl Eq for KeyPair {}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("role", &self.role)
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

fn encode_public(role: KeyRole, key: &VerifyingKey) -> String {
    let mut out = String::with_capacity(1 + KEY_HEX_LEN);
    out.push(role.prefix());
    out.push_str(&hex::encode_upper(key.as_bytes()));
    out
}

/// Parse a public identifier into its role and verifying key
pub fn parse_public_key(public: &str) -> Result<(KeyRole, VerifyingKey)> {
    let role = public
        .chars()
        .next()
        .and_then(KeyRole::from_prefix)
        .ok_or_else(|| RosterError::crypto(format!("unknown key prefix in {public:?}")))?;
    let body = &public[1..];
    if body.len() != KEY_HEX_LEN {
        return Err(RosterError::crypto(format!(
            "public key body must be {KEY_HEX_LEN} hex characters"
        )));
    }
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(body, &mut bytes)
        .map_err(|e| RosterError::crypto(format!("invalid public key: {e}")))?;
    let key = VerifyingKey::from_bytes(&bytes)
        .map_err(|e| RosterError::crypto(format!("invalid public key: {e}")))?;
    Ok((role, key))
}

/// True if `public` is a well-formed identifier for `role`
pub fn is_public_key_of(public: &str, role: KeyRole) -> bool {
    matches!(parse_public_key(public), Ok((r, _)) if r == role)
}

/// Verify a detached signature against a public identifier
pub fn verify(public: &str, message: &[u8], signature: &[u8]) -> Result<()> {
    let (_, key) = parse_public_key(public)?;
    let signature = Signature::from_slice(signature)
        .map_err(|e| RosterError::crypto(format!("malformed signature: {e}")))?;
    key.verify(message, &signature)
        .map_err(|_| RosterError::crypto(format!("signature does not verify for {public}")))
}
