//! Signed-token encoding for claims
//!
//! Tokens are compact JWTs: `header.payload.signature`, each part
//! base64url without padding. The signature is Ed25519 over
//! `header.payload` and is checked against the claim's issuer on decode.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::claims::{AccountClaim, ClaimFields, Claims, OperatorClaim, UserClaim};
use crate::errors::{Result, RosterError};
use crate::keys::{self, KeyPair};

const TOKEN_TYPE: &str = "JWT";
const ALGORITHM: &str = "ed25519";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    typ: String,
    alg: String,
}

/// Decodes raw tokens into typed claims
///
/// This is the seam the loader reads through; implementations decide how
/// a token is framed and verified.
pub trait ClaimCodec {
    /// Decode an operator token
    fn decode_operator(&self, token: &str) -> Result<OperatorClaim>;

    /// Decode an account token
    fn decode_account(&self, token: &str) -> Result<AccountClaim>;

    /// Decode a user token
    fn decode_user(&self, token: &str) -> Result<UserClaim>;
}

/// Ed25519 JWT codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtCodec;

impl JwtCodec {
    /// Sign `claims` with `signer`, filling in `jti`
    ///
    /// The claim's issuer must already name the signer.
    pub fn encode<T: ClaimFields>(&self, claims: &mut Claims<T>, signer: &KeyPair) -> Result<String> {
        let signer_public = signer.public_key();
        if claims.iss != signer_public {
            return Err(RosterError::invalid(format!(
                "claim issuer {} does not match signing key {signer_public}",
                claims.iss
            )));
        }

        claims.jti.clear();
        let unhashed = serde_json::to_vec(claims)?;
        claims.jti = hex::encode_upper(Sha256::digest(&unhashed));

        let header = serde_json::to_vec(&Header {
            typ: TOKEN_TYPE.to_string(),
            alg: ALGORITHM.to_string(),
        })?;
        let payload = serde_json::to_vec(claims)?;

        let mut token = String::new();
        token.push_str(&URL_SAFE_NO_PAD.encode(header));
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(payload));
        let signature = signer.sign(token.as_bytes());
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(signature));
        Ok(token)
    }

    /// Decode and verify a token of the expected claim type
    pub fn decode<T: ClaimFields>(&self, token: &str) -> Result<Claims<T>> {
        let token = token.trim();
        let mut parts = token.split('.');
        let (header_part, payload_part, signature_part) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err(RosterError::decode("token must have exactly three parts")),
            };

        let header: Header = serde_json::from_slice(&b64(header_part, "header")?)
            .map_err(|e| RosterError::decode(format!("invalid header: {e}")))?;
        if header.typ != TOKEN_TYPE || header.alg != ALGORITHM {
            return Err(RosterError::decode(format!(
                "unsupported token type {}/{}",
                header.typ, header.alg
            )));
        }

        let claims: Claims<T> = serde_json::from_slice(&b64(payload_part, "payload")?)
            .map_err(|e| RosterError::decode(format!("invalid payload: {e}")))?;
        if claims.nats.claim_type() != T::TYPE {
            return Err(RosterError::decode(format!(
                "expected {:?} claim, found {:?}",
                T::TYPE,
                claims.nats.claim_type()
            )));
        }

        let signature = b64(signature_part, "signature")?;
        let signed = &token[..header_part.len() + 1 + payload_part.len()];
        keys::verify(&claims.iss, signed.as_bytes(), &signature)
            .map_err(|e| RosterError::decode(format!("{} claim {}: {e}", claims.name, claims.sub)))?;

        Ok(claims)
    }
}

impl ClaimCodec for JwtCodec {
    fn decode_operator(&self, token: &str) -> Result<OperatorClaim> {
        self.decode(token)
    }

    fn decode_account(&self, token: &str) -> Result<AccountClaim> {
        self.decode(token)
    }

    fn decode_user(&self, token: &str) -> Result<UserClaim> {
        self.decode(token)
    }
}

fn b64(part: &str, what: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| RosterError::decode(format!("invalid {what} encoding: {e}")))
}
