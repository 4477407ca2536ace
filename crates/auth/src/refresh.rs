//! Opaque, long-lived, revocable refresh tokens.
//!
//! The token itself is 32 bytes from the OS random source, hex-encoded. This
//! module owns the policy (lifetime, usability, revocation semantics); the
//! records themselves live in a [`crate::store::RefreshTokenStore`].

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chirpy_core::UserId;

/// Entropy drawn for each refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Refresh token lifetime.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshTokenError {
    #[error("secure random source unavailable: {0}")]
    Entropy(String),

    #[error("refresh token has expired")]
    Expired,

    #[error("refresh token has been revoked")]
    Revoked,
}

/// Generate a new refresh token: 64 lowercase hex characters.
///
/// Fails instead of falling back to a weaker source.
pub fn generate_refresh_token() -> Result<String, RefreshTokenError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| RefreshTokenError::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Result of a revoke request against a stored record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// This call performed the revocation.
    Revoked(DateTime<Utc>),
    /// The record was already revoked at the given time; nothing changed.
    AlreadyRevoked(DateTime<Utc>),
}

impl RevokeOutcome {
    pub fn revoked_at(self) -> DateTime<Utc> {
        match self {
            RevokeOutcome::Revoked(at) | RevokeOutcome::AlreadyRevoked(at) => at,
        }
    }
}

/// A persisted refresh token.
///
/// # Invariants
/// - `revoked_at` moves from `None` to `Some` at most once and never back.
/// - The record is never deleted by revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// New record for `token`, expiring [`REFRESH_TOKEN_TTL_DAYS`] after `now`.
    pub fn issue(token: String, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            token,
            user_id,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
            revoked_at: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        is_usable(self, now)
    }

    /// Like [`Self::is_usable`], but says why not. Revocation wins over expiry.
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), RefreshTokenError> {
        if self.is_revoked() {
            return Err(RefreshTokenError::Revoked);
        }
        if self.is_expired(now) {
            return Err(RefreshTokenError::Expired);
        }
        Ok(())
    }

    /// Mark the record revoked. Idempotent; expired records can still be revoked.
    pub fn revoke(&mut self, now: DateTime<Utc>) -> RevokeOutcome {
        match self.revoked_at {
            Some(at) => RevokeOutcome::AlreadyRevoked(at),
            None => {
                self.revoked_at = Some(now);
                self.updated_at = now;
                RevokeOutcome::Revoked(now)
            }
        }
    }
}

/// A record is usable iff it is not revoked and `now` is before its expiry.
pub fn is_usable(record: &RefreshTokenRecord, now: DateTime<Utc>) -> bool {
    record.revoked_at.is_none() && now < record.expires_at
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(now: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord::issue(generate_refresh_token().unwrap(), UserId::new(), now)
    }

    #[test]
    fn generated_tokens_are_64_hex_chars() {
        let token = generate_refresh_token().unwrap();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn generated_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..256).map(|_| generate_refresh_token().unwrap()).collect();
        assert_eq!(tokens.len(), 256);
    }

    #[test]
    fn new_record_expires_after_sixty_days() {
        let now = Utc::now();
        let rec = record(now);
        assert_eq!(rec.expires_at - rec.created_at, Duration::days(60));
        assert!(rec.is_usable(now));
        assert!(rec.is_usable(rec.expires_at - Duration::seconds(1)));
    }

    #[test]
    fn unusable_one_second_past_expiry() {
        let now = Utc::now();
        let rec = record(now);
        let later = rec.expires_at + Duration::seconds(1);
        assert!(!is_usable(&rec, later));
        assert_eq!(rec.check_usable(later), Err(RefreshTokenError::Expired));
    }

    #[test]
    fn unusable_right_after_revocation_even_if_not_expired() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.revoke(now - Duration::seconds(1));
        assert!(!is_usable(&rec, now));
        assert_eq!(rec.check_usable(now), Err(RefreshTokenError::Revoked));
    }

    #[test]
    fn revoking_twice_keeps_the_first_timestamp() {
        let now = Utc::now();
        let mut rec = record(now);

        let first = rec.revoke(now);
        let second = rec.revoke(now + Duration::minutes(5));

        assert_eq!(first, RevokeOutcome::Revoked(now));
        assert_eq!(second, RevokeOutcome::AlreadyRevoked(now));
        assert_eq!(rec.revoked_at, Some(now));
        assert_eq!(rec.updated_at, now);
    }

    #[test]
    fn expired_record_can_still_be_revoked() {
        let now = Utc::now();
        let mut rec = record(now);
        let later = rec.expires_at + Duration::days(1);

        assert_eq!(rec.revoke(later), RevokeOutcome::Revoked(later));
        assert_eq!(rec.check_usable(later), Err(RefreshTokenError::Revoked));
    }
}
