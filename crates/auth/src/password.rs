//! Password credential hashing.
//!
//! Hashes are bcrypt modular-crypt strings (`$2b$<cost>$<salt><digest>`), so
//! the algorithm, cost and salt travel with the digest. Verification goes
//! through bcrypt's constant-time comparison.

use thiserror::Error;

/// Input ceiling of the bcrypt primitive. Longer inputs would be truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Work factor applied to every new hash.
pub const HASH_COST: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password is {len} bytes; at most {max} bytes are allowed")]
    TooLong { len: usize, max: usize },

    /// The stored hash is not a bcrypt string. Never produced by [`hash_password`].
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Hash a plaintext password for storage.
///
/// The empty password is accepted; rejecting it is a registration policy, not
/// a hashing concern.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    if plaintext.len() > MAX_PASSWORD_BYTES {
        return Err(PasswordError::TooLong {
            len: plaintext.len(),
            max: MAX_PASSWORD_BYTES,
        });
    }

    bcrypt::hash(plaintext, HASH_COST).map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Check a candidate password against a stored hash.
///
/// Returns `Ok(false)` on mismatch. Candidates longer than
/// [`MAX_PASSWORD_BYTES`] never match: no stored hash can have come from them,
/// and the primitive would otherwise compare only their prefix.
pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
    if plaintext.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }

    bcrypt::verify(plaintext, hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))
}
