//! Resource ownership policy.
//!
//! Mutation of an owned resource (deleting a chirp) requires the
//! authenticated user to be the resource's owner. Existence is checked before
//! ownership, so a missing resource reports `NotFound` to everyone.

use thiserror::Error;

use chirpy_core::{Owned, UserId};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    #[error("resource not found")]
    NotFound,

    #[error("forbidden: not the owner")]
    Forbidden,
}

pub fn is_owner(owner: UserId, actor: UserId) -> bool {
    owner == actor
}

/// Authorize `actor` to mutate `resource`.
///
/// - No IO
/// - No panics
pub fn authorize_owner<R: Owned>(resource: Option<&R>, actor: UserId) -> Result<&R, AuthzError> {
    let resource = resource.ok_or(AuthzError::NotFound)?;
    if is_owner(resource.owner(), actor) {
        Ok(resource)
    } else {
        Err(AuthzError::Forbidden)
    }
}
