use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chirpy_auth::User;
use chirpy_chirps::{Chirp, ListChirps, SortOrder};
use chirpy_core::{ChirpId, DomainError, DomainResult, UserId};

// -------------------------
// Request DTOs
// -------------------------

/// Registration, login and credential update all take the same body.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsRequest {
    /// Reject blank email or empty password before touching storage.
    pub fn validate(&self) -> DomainResult<()> {
        if self.email.trim().is_empty() {
            return Err(DomainError::validation("email must not be empty"));
        }
        if self.password.is_empty() {
            return Err(DomainError::validation("password must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateChirpRequest {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListChirpsQuery {
    pub author_id: Option<String>,
    pub sort: Option<String>,
}

impl TryFrom<ListChirpsQuery> for ListChirps {
    type Error = DomainError;

    fn try_from(q: ListChirpsQuery) -> Result<Self, Self::Error> {
        let author_id = match q.author_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<UserId>()?),
        };
        let sort = match q.sort.as_deref().map(str::trim) {
            None | Some("") => SortOrder::default(),
            Some(raw) => raw.parse()?,
        };
        Ok(ListChirps { author_id, sort })
    }
}

pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

#[derive(Debug, Deserialize)]
pub struct PolkaWebhookRequest {
    pub event: String,
    #[serde(default)]
    pub data: PolkaWebhookData,
}

#[derive(Debug, Default, Deserialize)]
pub struct PolkaWebhookData {
    pub user_id: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            created_at: u.created_at,
            updated_at: u.updated_at,
            email: u.email,
            is_chirpy_red: u.is_chirpy_red,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ChirpResponse {
    pub id: ChirpId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: UserId,
}

impl From<Chirp> for ChirpResponse {
    fn from(c: Chirp) -> Self {
        Self {
            id: c.id,
            created_at: c.created_at,
            updated_at: c.updated_at,
            body: c.body,
            user_id: c.user_id,
        }
    }
}
