//! Registered users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chirpy_core::{DomainError, DomainResult, Entity, UserId};

/// Name of the unique constraint on user emails. Stores report it in
/// [`chirpy_core::StoreError::UniqueViolation`] so callers can map it to a
/// conflict.
pub const USERS_EMAIL_KEY: &str = "users_email_key";

/// A stored user. `hashed_password` never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_chirpy_red: bool,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input to [`crate::store::UserStore::create_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
}

impl NewUser {
    /// Build a new user record after checking the email is present.
    ///
    /// The password must already be hashed.
    pub fn new(email: impl Into<String>, hashed_password: impl Into<String>) -> DomainResult<Self> {
        Ok(Self {
            email: normalize_email(email)?,
            hashed_password: hashed_password.into(),
        })
    }
}

/// Trim surrounding whitespace and reject an empty email.
///
/// Emails are otherwise stored as given; uniqueness is exact-match.
pub fn normalize_email(email: impl Into<String>) -> DomainResult<String> {
    let email = email.into();
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("email is required"));
    }
    Ok(trimmed.to_string())
}
