//! Signed, time-limited identity tokens (HS256 JWT).
//!
//! Payload shape: `{ "user": { "id", "username" }, "iat", "exp" }`. Tokens are
//! stateless; nothing is recorded server-side.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use shelf_kernel::settings::AuthSettings;
use uuid::Uuid;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Verified caller identity carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user: Identity,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Why a token was refused.
///
/// Callers must not reveal the variant to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("token expired")]
    Expired,
    #[error("token is structurally invalid")]
    Malformed,
    #[error("token signature mismatch")]
    InvalidSignature,
    #[error("token payload lacks the user identifier")]
    InvalidPayload,
}

#[derive(Debug, thiserror::Error)]
#[error("token signing failed: {0}")]
pub struct SigningError(#[from] jsonwebtoken::errors::Error);

/// Looser view of the payload so a missing or mistyped `user.id` is told
/// apart from a structurally broken token.
#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    user: Option<serde_json::Value>,
    #[serde(default)]
    iat: i64,
    // Absence is reported by `Validation` as a missing required claim.
    #[serde(default)]
    exp: Option<i64>,
}

/// Signing and verification keys derived once from the process secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is exact; no clock-skew grace period.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            settings.jwt_secret.as_bytes(),
            Duration::from_secs(settings.token_ttl_secs),
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `identity` expiring `ttl` from now.
    pub fn issue(&self, identity: &Identity) -> Result<String, SigningError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user: identity.clone(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };
        self.sign(&claims)
    }

    /// Verify signature and expiry, then require a user identifier.
    pub fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        let data = decode::<RawClaims>(token, &self.decoding, &self.validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => VerificationError::Expired,
                ErrorKind::InvalidSignature => VerificationError::InvalidSignature,
                ErrorKind::MissingRequiredClaim(_) => VerificationError::InvalidPayload,
                _ => VerificationError::Malformed,
            }
        })?;

        let raw = data.claims;
        let user = raw
            .user
            .as_ref()
            .and_then(|user| user.as_object())
            .ok_or(VerificationError::InvalidPayload)?;

        let id = user
            .get("id")
            .and_then(|id| id.as_str())
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(VerificationError::InvalidPayload)?;

        let username = user
            .get("username")
            .and_then(|name| name.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Claims {
            user: Identity { id, username },
            iat: raw.iat,
            exp: raw.exp.unwrap_or_default(),
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, SigningError> {
        Ok(encode(&Header::new(ALGORITHM), claims, &self.encoding)?)
    }
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("algorithm", &ALGORITHM)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
