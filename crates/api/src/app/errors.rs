//! HTTP error mapping.
//!
//! [`ApiError::status`] is the only place an error becomes a status code.
//! Bodies are always `{"error": <code>, "message": <text>}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use chirpy_auth::{AuthError, AuthzError, PasswordError, USERS_EMAIL_KEY};
use chirpy_core::{DomainError, StoreError};

use crate::credentials::CredentialError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(kind) => match kind {
                AuthError::InvalidCredentials
                | AuthError::MalformedToken
                | AuthError::ExpiredToken
                | AuthError::RevokedToken
                | AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::NotFound => StatusCode::NOT_FOUND,
                AuthError::InternalFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Auth(kind) => match kind {
                AuthError::InvalidCredentials => "invalid_credentials",
                AuthError::MalformedToken => "malformed_token",
                AuthError::ExpiredToken => "expired_token",
                AuthError::RevokedToken => "revoked_token",
                AuthError::MissingCredentials => "missing_credentials",
                AuthError::Forbidden => "forbidden",
                AuthError::NotFound => "not_found",
                AuthError::InternalFailure(_) => "internal_error",
            },
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Conflict(_) => "conflict",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Auth(AuthError::InternalFailure(cause)) => {
                error!(%cause, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        json_error(status, self.code(), message)
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ApiError::BadRequest(msg),
            DomainError::NotFound => ApiError::Auth(AuthError::NotFound),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_unique_violation_of(USERS_EMAIL_KEY) {
            return ApiError::Conflict("user already exists".to_string());
        }
        match err {
            StoreError::NotFound => ApiError::Auth(AuthError::NotFound),
            other => ApiError::Auth(AuthError::internal(other.to_string())),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Auth(err.into())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        ApiError::Auth(err.into())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooLong { max, .. } => {
                ApiError::BadRequest(format!("password must be at most {max} bytes"))
            }
            other => ApiError::Auth(AuthError::internal(other.to_string())),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
