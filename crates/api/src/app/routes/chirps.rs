use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;

use chirpy_auth::AuthError;
use chirpy_chirps::{ChirpBody, ListChirps, NewChirp};
use chirpy_core::ChirpId;

use crate::app::dto::{ChirpResponse, CreateChirpRequest, ListChirpsQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::ensure_owner;
use crate::context::PrincipalContext;

pub async fn create_chirp(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<CreateChirpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChirpResponse>), ApiError> {
    let Json(body) = payload?;
    let new = NewChirp {
        body: ChirpBody::parse(body.body)?,
        user_id: principal.user_id(),
    };

    let chirp = services.chirps.create_chirp(new, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(chirp.into())))
}

pub async fn list_chirps(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<ListChirpsQuery>, QueryRejection>,
) -> Result<Json<Vec<ChirpResponse>>, ApiError> {
    let Query(query) = query?;
    let opts = ListChirps::try_from(query)?;

    let chirps = services.chirps.list_chirps(&opts).await?;
    Ok(Json(chirps.into_iter().map(ChirpResponse::from).collect()))
}

pub async fn get_chirp(
    Extension(services): Extension<Arc<AppServices>>,
    id: Result<Path<ChirpId>, PathRejection>,
) -> Result<Json<ChirpResponse>, ApiError> {
    let Path(id) = id?;
    let chirp = services
        .chirps
        .chirp(id)
        .await?
        .ok_or(AuthError::NotFound)?;
    Ok(Json(chirp.into()))
}

/// Only the author may delete a chirp.
pub async fn delete_chirp(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    id: Result<Path<ChirpId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let chirp = services.chirps.chirp(id).await?;
    ensure_owner(&principal, chirp.as_ref())?;

    if !services.chirps.delete_chirp(id).await? {
        return Err(AuthError::NotFound.into());
    }

    info!(chirp_id = %id, user_id = %principal.user_id(), "chirp deleted");
    Ok(StatusCode::NO_CONTENT)
}
