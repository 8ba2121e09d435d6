//! Ed25519-signed JWT verification.
//!
//! Tokens are compact JWS strings (`header.claims.signature`, each segment
//! base64url without padding). Only `alg: EdDSA` is accepted. The claims
//! this verifier reads:
//!
//! | Claim | Required | Meaning |
//! |-------|----------|---------|
//! | `sub` | yes | Subject id of the caller |
//! | `exp` | yes | Expiry, seconds since the epoch |
//! | `scopes` | no | Granted scopes, an array of strings |
//! | `nbf` | no | Not-before, seconds since the epoch |
//! | `iss` | when configured | Must equal the configured issuer |
//! | `aud` | when configured | Must contain the configured audience |

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use marquee_core::{BoxFuture, CredentialVerifier, VerificationError, VerifiedCredential};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::KeyError;

/// Clock skew tolerated on `exp` and `nbf`, in seconds.
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

const ALGORITHM: &str = "EdDSA";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn contains(&self, expected: &str) -> bool {
        match self {
            Self::One(aud) => aud == expected,
            Self::Many(auds) => auds.iter().any(|a| a == expected),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    #[serde(default)]
    scopes: Vec<String>,
    #[serde(default)]
    nbf: Option<i64>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
}

/// Verifies EdDSA JWTs against a single Ed25519 public key.
#[derive(Debug, Clone)]
pub struct JwtVerifier {
    key: VerifyingKey,
    issuer: Option<String>,
    audience: Option<String>,
    leeway_secs: u64,
}

impl JwtVerifier {
    /// Creates a verifier for `key` with the default leeway and no issuer or
    /// audience checks.
    #[must_use]
    pub fn new(key: VerifyingKey) -> Self {
        Self {
            key,
            issuer: None,
            audience: None,
            leeway_secs: DEFAULT_LEEWAY_SECS,
        }
    }

    /// Creates a verifier from a hex-encoded 32-byte public key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if the string is not hex, not 32 bytes, or not a
    /// valid curve point.
    pub fn from_hex(public_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(public_key.trim()).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self::new(key))
    }

    /// Requires `iss` to equal `issuer`.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Requires `aud` to contain `audience`.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the tolerated clock skew.
    #[must_use]
    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    /// Verifies `token` as of `now` (seconds since the epoch).
    ///
    /// # Errors
    ///
    /// - `Malformed` if the token does not decode
    /// - `InvalidSignature` if the signature does not match the key
    /// - `Expired` if `exp` plus leeway is in the past
    /// - `Rejected` for an unsupported algorithm or a failed claim check
    pub fn verify_at(&self, token: &str, now: i64) -> Result<VerifiedCredential, VerificationError> {
        let mut segments = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(VerificationError::Malformed(
                "expected three dot-separated segments".to_string(),
            ));
        };

        let decoded: Header = decode_json(header, "header")?;
        if decoded.alg != ALGORITHM {
            return Err(VerificationError::Rejected(format!(
                "unsupported algorithm '{}'",
                decoded.alg
            )));
        }

        let signature = decode_signature(signature)?;
        let signing_input = &token[..header.len() + 1 + claims.len()];
        self.key
            .verify_strict(signing_input.as_bytes(), &signature)
            .map_err(|_| VerificationError::InvalidSignature)?;

        let claims: Claims = decode_json(claims, "claims")?;
        self.check_claims(&claims, now)?;

        Ok(VerifiedCredential::new(claims.sub, claims.scopes))
    }

    fn check_claims(&self, claims: &Claims, now: i64) -> Result<(), VerificationError> {
        let leeway = i64::try_from(self.leeway_secs).unwrap_or(i64::MAX);

        if now > claims.exp.saturating_add(leeway) {
            return Err(VerificationError::Expired);
        }
        if let Some(nbf) = claims.nbf {
            if nbf > now.saturating_add(leeway) {
                return Err(VerificationError::Rejected("token not yet valid".to_string()));
            }
        }
        if let Some(expected) = &self.issuer {
            if claims.iss.as_deref() != Some(expected.as_str()) {
                return Err(VerificationError::Rejected("issuer mismatch".to_string()));
            }
        }
        if let Some(expected) = &self.audience {
            if !claims.aud.as_ref().is_some_and(|aud| aud.contains(expected)) {
                return Err(VerificationError::Rejected("audience mismatch".to_string()));
            }
        }
        Ok(())
    }
}

impl CredentialVerifier for JwtVerifier {
    fn verify<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, Result<VerifiedCredential, VerificationError>> {
        let result = self.verify_at(token, Utc::now().timestamp());
        if let Err(err) = &result {
            debug!(error = %err, "jwt rejected");
        }
        Box::pin(std::future::ready(result))
    }
}

/// Signs `claims` into a compact EdDSA JWT.
///
/// Used by tests and local tooling to mint tokens the [`JwtVerifier`]
/// accepts.
///
/// # Errors
///
/// Returns an error if `claims` cannot be serialized.
pub fn sign<C: Serialize>(key: &SigningKey, claims: &C) -> Result<String, serde_json::Error> {
    let header = Header {
        alg: ALGORITHM.to_string(),
        typ: Some("JWT".to_string()),
    };
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
    );
    let signature = key.sign(signing_input.as_bytes());
    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    ))
}

fn decode_json<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, VerificationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| VerificationError::Malformed(format!("{what} is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| VerificationError::Malformed(format!("invalid {what}: {e}")))
}

fn decode_signature(segment: &str) -> Result<Signature, VerificationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| VerificationError::Malformed(format!("signature is not base64url: {e}")))?;
    let bytes: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| VerificationError::Malformed("signature must be 64 bytes".to_string()))?;
    Ok(Signature::from_bytes(&bytes))
}
