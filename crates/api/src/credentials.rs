//! `Authorization` header parsing.
//!
//! Credentials come only from the `Authorization` header: never from the
//! query string, a cookie or the body.

use axum::http::{header, HeaderMap};
use thiserror::Error;

use chirpy_auth::AuthError;

pub const BEARER_SCHEME: &str = "Bearer";
pub const API_KEY_SCHEME: &str = "ApiKey";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    #[error("authorization header is missing")]
    Missing,

    #[error("authorization header uses an unexpected scheme")]
    InvalidScheme,

    #[error("authorization header carries no credential")]
    Empty,
}

impl From<CredentialError> for AuthError {
    fn from(_: CredentialError) -> Self {
        AuthError::MissingCredentials
    }
}

/// `Authorization: Bearer <token>`
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, CredentialError> {
    extract_scheme(headers, BEARER_SCHEME)
}

/// `Authorization: ApiKey <key>`
pub fn extract_api_key(headers: &HeaderMap) -> Result<&str, CredentialError> {
    extract_scheme(headers, API_KEY_SCHEME)
}

fn extract_scheme<'h>(headers: &'h HeaderMap, scheme: &str) -> Result<&'h str, CredentialError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(CredentialError::Missing)?;

    let header = header.to_str().map_err(|_| CredentialError::InvalidScheme)?;

    let rest = header
        .strip_prefix(scheme)
        .ok_or(CredentialError::InvalidScheme)?;

    // Scheme must be followed by whitespace ("Bearerabc" is not a bearer token).
    if !rest.is_empty() && !rest.starts_with(' ') {
        return Err(CredentialError::InvalidScheme);
    }

    let credential = rest.trim();
    if credential.is_empty() {
        return Err(CredentialError::Empty);
    }

    Ok(credential)
}
