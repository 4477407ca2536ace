use chirpy_auth::AuthError;
use chirpy_core::UserId;

/// Principal context for a request (the authenticated user).
///
/// Inserted by the auth middleware; handlers behind it extract it with
/// `Extension<PrincipalContext>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
}

impl PrincipalContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// Result of authenticating a request.
pub type AuthOutcome = Result<PrincipalContext, AuthError>;
