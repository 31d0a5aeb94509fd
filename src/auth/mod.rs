pub mod password;
pub mod resolver;
pub mod revocation;
pub mod token;

use std::fmt;
use thiserror::Error;

pub use resolver::{AdminPolicy, AdminRoleResolver, GrantStore};
pub use revocation::RevocationList;
pub use token::{Claims, Clock, FixedClock, IssuedToken, Subject, SystemClock, TokenService};

/// Why a bearer token was rejected. Callers outside the audit log treat all
/// reasons the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTokenReason {
    Malformed,
    BadSignature,
    Expired,
    Revoked,
}

impl fmt::Display for InvalidTokenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InvalidTokenReason::Malformed => "malformed",
            InvalidTokenReason::BadSignature => "bad signature",
            InvalidTokenReason::Expired => "expired",
            InvalidTokenReason::Revoked => "revoked",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(InvalidTokenReason),

    #[error("Admin privilege required")]
    InsufficientPrivilege,

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication misconfigured: {0}")]
    Configuration(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}
