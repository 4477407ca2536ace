//! Authentication failure taxonomy.
//!
//! Every component in this crate surfaces its own fine-grained error
//! (`TokenError`, `PasswordError`, ...). Callers that only need to decide how
//! to answer a request convert those into an [`AuthError`] kind; the HTTP
//! boundary maps each kind to exactly one status code.

use thiserror::Error;

use chirpy_core::StoreError;

use crate::ownership::AuthzError;
use crate::password::PasswordError;
use crate::refresh::RefreshTokenError;
use crate::token::TokenError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Wrong password, or no such user. Both look the same from outside.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Token could not be parsed, failed signature or issuer checks.
    #[error("malformed token")]
    MalformedToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token has been revoked")]
    RevokedToken,

    /// No `Authorization` header, or the wrong scheme.
    #[error("missing or invalid credentials")]
    MissingCredentials,

    /// Authenticated, but not the owner of the resource.
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Storage unavailable, random source exhausted, hashing primitive error.
    ///
    /// The message is for server-side logs only.
    #[error("internal failure: {0}")]
    InternalFailure(String),
}

impl AuthError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalFailure(msg.into())
    }

    /// True for every kind that means "the caller is not authenticated".
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::MalformedToken
                | AuthError::ExpiredToken
                | AuthError::RevokedToken
                | AuthError::MissingCredentials
        )
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::Signing(msg) => AuthError::InternalFailure(msg),
            TokenError::Malformed(_)
            | TokenError::InvalidSignature
            | TokenError::InvalidIssuer
            | TokenError::InvalidTimeWindow
            | TokenError::NotYetValid
            | TokenError::MalformedSubject => AuthError::MalformedToken,
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooLong { .. } => AuthError::InvalidCredentials,
            PasswordError::MalformedHash(msg) | PasswordError::Hashing(msg) => {
                AuthError::InternalFailure(msg)
            }
        }
    }
}

impl From<RefreshTokenError> for AuthError {
    fn from(err: RefreshTokenError) -> Self {
        match err {
            RefreshTokenError::Expired => AuthError::ExpiredToken,
            RefreshTokenError::Revoked => AuthError::RevokedToken,
            RefreshTokenError::Entropy(msg) => AuthError::InternalFailure(msg),
        }
    }
}

impl From<AuthzError> for AuthError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotFound => AuthError::NotFound,
            AuthzError::Forbidden => AuthError::Forbidden,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::InternalFailure(err.to_string())
    }
}
