//! API-side ownership guard.
//!
//! Called by mutating handlers after loading the resource and before the
//! mutation.

use chirpy_auth::authorize_owner;
use chirpy_core::Owned;

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

/// Return the resource if it exists and the caller owns it.
///
/// Missing resource is `NotFound` for everyone; someone else's resource is
/// `Forbidden`.
pub fn ensure_owner<'a, R: Owned>(
    principal: &PrincipalContext,
    resource: Option<&'a R>,
) -> Result<&'a R, ApiError> {
    Ok(authorize_owner(resource, principal.user_id())?)
}
