use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use chirpy_auth::{AuthError, JwtValidator};
use chirpy_observability::RequestCounter;

use crate::app::errors::ApiError;
use crate::context::{AuthOutcome, PrincipalContext};
use crate::credentials::extract_bearer;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Resolve the caller from the bearer access token.
///
/// Stateless: no IO beyond signature and claim checks.
pub fn authenticate(headers: &HeaderMap, jwt: &dyn JwtValidator, now: DateTime<Utc>) -> AuthOutcome {
    let token = extract_bearer(headers).map_err(AuthError::from)?;
    let user_id = jwt.validate(token, now).map_err(|e| {
        debug!(reason = %e, "access token rejected");
        AuthError::from(e)
    })?;
    Ok(PrincipalContext::new(user_id))
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = authenticate(req.headers(), state.jwt.as_ref(), Utc::now())?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Count every request that reaches the router.
pub async fn count_requests(
    State(counter): State<Arc<RequestCounter>>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    counter.increment();
    next.run(req).await
}
