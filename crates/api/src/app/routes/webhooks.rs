use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::{info, warn};

use chirpy_auth::AuthError;
use chirpy_core::UserId;

use crate::app::dto::{PolkaWebhookRequest, USER_UPGRADED_EVENT};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::credentials::extract_api_key;

/// Billing provider callback. Authenticated with `Authorization: ApiKey <key>`.
pub async fn polka(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    payload: Result<Json<PolkaWebhookRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let key = extract_api_key(&headers)?;
    if !services.polka_key_matches(key) {
        warn!("webhook call with wrong api key");
        return Err(AuthError::InvalidCredentials.into());
    }

    let Json(body) = payload?;
    if body.event != USER_UPGRADED_EVENT {
        return Ok(StatusCode::NO_CONTENT);
    }

    let user_id: UserId = body
        .data
        .user_id
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("data.user_id is required"))?
        .parse()?;

    services
        .users
        .set_chirpy_red(user_id, true, Utc::now())
        .await?
        .ok_or(AuthError::NotFound)?;

    info!(%user_id, "user upgraded to chirpy red");
    Ok(StatusCode::NO_CONTENT)
}
