//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage selection and shared services
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: the error → status table and JSON error bodies

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;

use chirpy_auth::JwtValidator;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router from configuration (public entrypoint used by
/// `main.rs`).
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router(services))
}

/// Build the router around already-wired services.
pub fn router(services: Arc<AppServices>) -> Router {
    let jwt: Arc<dyn JwtValidator> = services.jwt().clone();
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid access token.
    let protected = routes::protected_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    let api = routes::public_router().merge(protected);

    Router::new()
        .nest("/api", api)
        .nest("/admin", routes::admin::router())
        .nest_service("/app", ServeDir::new(&services.static_root))
        // Outermost first: every request is counted, including rejected ones.
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    services.counter.clone(),
                    middleware::count_requests,
                ))
                .layer(Extension(services.clone())),
        )
}
