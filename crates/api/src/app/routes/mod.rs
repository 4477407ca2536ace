use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub mod admin;
pub mod chirps;
pub mod sessions;
pub mod system;
pub mod users;
pub mod webhooks;

/// `/api` endpoints that authenticate themselves (or need no auth).
pub fn public_router() -> Router {
    Router::new()
        .route("/healthz", get(system::healthz))
        .route("/users", post(users::create_user))
        .route("/login", post(sessions::login))
        .route("/refresh", post(sessions::refresh))
        .route("/revoke", post(sessions::revoke))
        .route("/chirps", get(chirps::list_chirps))
        .route("/chirps/:id", get(chirps::get_chirp))
        .route("/polka/webhooks", post(webhooks::polka))
}

/// `/api` endpoints behind the access-token middleware.
pub fn protected_router() -> Router {
    Router::new()
        .route("/users", put(users::update_user))
        .route("/chirps", post(chirps::create_chirp))
        .route("/chirps/:id", delete(chirps::delete_chirp))
}
