use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use tracing::info;

use chirpy_auth::AuthError;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/reset", post(reset))
}

pub async fn metrics(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    let hits = services.counter.get();
    (
        [(header::CACHE_CONTROL, "no-store")],
        Html(format!(
            "<html>\n  <body>\n    <h1>Welcome, Chirpy Admin</h1>\n    <p>Chirpy has been visited {hits} times!</p>\n  </body>\n</html>\n"
        )),
    )
}

/// Zero the request counter and delete every user. Dev platform only.
pub async fn reset(Extension(services): Extension<Arc<AppServices>>) -> Result<impl IntoResponse, ApiError> {
    if !services.platform.is_dev() {
        return Err(AuthError::Forbidden.into());
    }

    let users = services.users.delete_all_users().await?;
    let hits = services.counter.reset();
    info!(hits, users, "state reset");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "OK",
    ))
}
