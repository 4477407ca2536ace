use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;

use chirpy_auth::AuthError;

use crate::app::dto::{CredentialsRequest, LoginResponse, TokenResponse, UserResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::credentials::extract_bearer;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;

    let session = services
        .sessions
        .login(body.email.trim(), &body.password, Utc::now())
        .await?;

    let user = services
        .users
        .user(session.user_id)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    Ok(Json(LoginResponse {
        user: UserResponse::from(user),
        token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

/// Exchange the refresh token in `Authorization: Bearer` for a new access token.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let refresh_token = extract_bearer(&headers)?;
    let token = services.sessions.refresh(refresh_token, Utc::now()).await?;
    Ok(Json(TokenResponse { token }))
}

pub async fn revoke(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let refresh_token = extract_bearer(&headers)?;
    services.sessions.revoke(refresh_token, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}
