use super::AuthError;

/// Minimum accepted password length at signup
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Returns false for a wrong password; an unreadable hash is an error
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Hashing(e.to_string()))
}
