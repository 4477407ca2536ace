use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;

use chirpy_auth::{hash_password_blocking, normalize_email, NewUser};

use crate::app::dto::{CredentialsRequest, UserResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(body) = payload?;
    body.validate()?;

    let hashed = hash_password_blocking(&body.password).await?;
    let user = services
        .users
        .create_user(NewUser::new(body.email, hashed)?, Utc::now())
        .await?;

    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Replace the caller's own email and password.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;

    let email = normalize_email(body.email)?;
    let hashed = hash_password_blocking(&body.password).await?;
    let user = services
        .users
        .update_credentials(principal.user_id(), &email, &hashed, Utc::now())
        .await?;

    info!(user_id = %user.id, "user credentials updated");
    Ok(Json(user.into()))
}
