//! `chirpy-auth`: authentication and session-authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: persistence is
//! reached only through the contracts in [`store`], and transport concerns
//! (header parsing, status codes) live in the API crate.

pub mod error;
pub mod ownership;
pub mod password;
pub mod refresh;
pub mod session;
pub mod store;
pub mod token;
pub mod user;

pub use error::AuthError;
pub use ownership::{authorize_owner, is_owner, AuthzError};
pub use password::{hash_password, verify_password, PasswordError, MAX_PASSWORD_BYTES};
pub use refresh::{
    generate_refresh_token, is_usable, RefreshTokenError, RefreshTokenRecord, RevokeOutcome,
    REFRESH_TOKEN_TTL_DAYS,
};
pub use session::{hash_password_blocking, Session, SessionService};
pub use store::{CredentialStore, Credentials, RefreshTokenStore, UserStore};
pub use token::{
    issue_access_token, validate_access_token, validate_claims, Hs256Jwt, JwtClaims, JwtValidator,
    TokenError, ACCESS_TOKEN_TTL_SECS, ISSUER,
};
pub use user::{normalize_email, NewUser, User, USERS_EMAIL_KEY};
