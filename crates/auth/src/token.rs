//! Signed access tokens (HS256 JWT).
//!
//! Access tokens are stateless: validity is decided purely by signature,
//! issuer and the time window. There is no server-side revocation list for
//! them; a leaked token stays valid until it expires. Long-lived, revocable
//! sessions are handled by [`crate::refresh`].

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chirpy_core::UserId;

/// Issuer written into, and required from, every access token.
pub const ISSUER: &str = "chirpy";

/// Default access token lifetime (one hour).
pub const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Registered JWT claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    #[serde(rename = "iss")]
    pub issuer: String,

    /// Subject: the user id in its canonical UUID text form.
    pub sub: String,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    pub fn new(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            issuer: ISSUER.to_string(),
            sub: user_id.to_string(),
            issued_at: now,
            expires_at: now + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token issuer is not recognized")]
    InvalidIssuer,

    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("token subject is not a valid user id")]
    MalformedSubject,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Deterministically validate the time window of decoded claims.
///
/// A token is live for `issued_at <= now < expires_at`.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenError::Expired);
    }
    Ok(())
}

/// Access-token validation seam used by the request middleware.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError>;
}

/// HS256 issuer/validator keyed by a shared secret.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").finish_non_exhaustive()
    }
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        // Expiry is checked by `validate_claims` against an injected clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = ["exp", "iss", "sub"]
            .into_iter()
            .map(String::from)
            .collect::<HashSet<_>>();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a token for `user_id`, valid from `now` for `ttl`.
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Result<String, TokenError> {
        let claims = JwtClaims::new(user_id, now, ttl);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and issuer, returning the claims without a time check.
    pub fn decode(&self, token: &str) -> Result<JwtClaims, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        if data.claims.issuer != ISSUER {
            return Err(TokenError::InvalidIssuer);
        }
        Ok(data.claims)
    }

    /// Full validation: signature, issuer, time window, then subject.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        let claims = self.decode(token)?;
        validate_claims(&claims, now)?;
        claims
            .sub
            .parse::<UserId>()
            .map_err(|_| TokenError::MalformedSubject)
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        Hs256Jwt::validate(self, token, now)
    }
}

/// Issue an access token for `user_id` signed with `secret`, starting now.
pub fn issue_access_token(user_id: UserId, secret: &str, ttl: Duration) -> Result<String, TokenError> {
    Hs256Jwt::new(secret).issue(user_id, Utc::now(), ttl)
}

/// Validate an access token signed with `secret` against the current time.
pub fn validate_access_token(token: &str, secret: &str) -> Result<UserId, TokenError> {
    Hs256Jwt::new(secret).validate(token, Utc::now())
}
