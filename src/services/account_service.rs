use std::sync::Arc;

use serde::Deserialize;

use crate::audit::{self, AuditEvent};
use crate::auth::password::{self, MIN_PASSWORD_LENGTH};
use crate::auth::{AuthError, IssuedToken, Subject, TokenService};
use crate::database::models::{normalize_email, Principal};
use crate::database::{DatabaseError, GrantRepository, PrincipalRepository};

/// Role claim for principals without an admin grant
pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct SigninOutcome {
    pub principal: Principal,
    pub issued: IssuedToken,
}

/// Signup and signin on top of the credential store and token service
pub struct AccountService {
    principals: PrincipalRepository,
    grants: GrantRepository,
    tokens: Arc<TokenService>,
    password_cost: u32,
    /// Verified against when the email is unknown, so both failures cost one bcrypt check
    dummy_hash: String,
}

impl AccountService {
    pub fn new(
        principals: PrincipalRepository,
        grants: GrantRepository,
        tokens: Arc<TokenService>,
        password_cost: u32,
    ) -> Result<Self, AuthError> {
        let dummy_hash = password::hash_password(&uuid::Uuid::new_v4().to_string(), password_cost)?;
        Ok(Self {
            principals,
            grants,
            tokens,
            password_cost,
            dummy_hash,
        })
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<Principal, AccountError> {
        validate_email_format(&request.email)?;
        validate_name(&request.name)?;
        validate_password(&request.password)?;

        let email = normalize_email(&request.email);
        if self.principals.find_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken(email));
        }

        let password_hash = hash_blocking(request.password.clone(), self.password_cost).await?;

        match self.principals.create(&email, &request.name, &password_hash).await {
            Ok(principal) => {
                tracing::info!("Registered principal {} ({})", principal.id, principal.email);
                Ok(principal)
            }
            // Lost a race with a concurrent signup for the same address
            Err(DatabaseError::Conflict(_)) => Err(AccountError::EmailTaken(email)),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials and issue a token. Unknown email and wrong password
    /// produce the same error.
    pub async fn signin(&self, request: &SigninRequest) -> Result<SigninOutcome, AccountError> {
        let email = normalize_email(&request.email);

        let principal = match self.principals.find_by_email(&email).await? {
            Some(principal) => principal,
            None => {
                verify_blocking(request.password.clone(), self.dummy_hash.clone()).await?;
                audit::record(AuditEvent::SigninFailed, None, &format!("unknown email '{}'", email));
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !verify_blocking(request.password.clone(), principal.password_hash.clone()).await? {
            audit::record(AuditEvent::SigninFailed, Some(&principal.id), "wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let subject = Subject {
            subject_id: principal.id.clone(),
            email: principal.email.clone(),
            role: self.role_for(&principal.id).await,
        };
        let issued = self.tokens.issue(&subject)?;

        audit::record(
            AuditEvent::SigninSucceeded,
            Some(&principal.id),
            &format!("token issued with role '{}'", subject.role),
        );

        Ok(SigninOutcome { principal, issued })
    }

    /// Role to embed in a fresh token: the grant's role, or the default role.
    /// A failed lookup never yields an elevated claim.
    pub async fn role_for(&self, principal_id: &str) -> String {
        match self.grants.find_by_principal(principal_id).await {
            Ok(Some(grant)) => grant.role,
            Ok(None) => DEFAULT_ROLE.to_string(),
            Err(e) => {
                tracing::warn!("Grant lookup failed for {} at signin: {}", principal_id, e);
                DEFAULT_ROLE.to_string()
            }
        }
    }
}

async fn hash_blocking(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || password::hash_password(&password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}

/// Basic email validation for signup
pub fn validate_email_format(email: &str) -> Result<(), AccountError> {
    let invalid = |message: &str| AccountError::Validation {
        field: "email",
        message: message.to_string(),
    };

    let email = email.trim();
    if email.is_empty() {
        return Err(invalid("Email cannot be empty"));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(invalid("Invalid email format"));
    }
    if parts[1].starts_with('.') || parts[1].ends_with('.') {
        return Err(invalid("Invalid email format"));
    }

    Ok(())
}

fn validate_name(name: &str) -> Result<(), AccountError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(AccountError::Validation {
            field: "name",
            message: "Name must be between 1 and 100 characters".to_string(),
        });
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::Validation {
            field: "password",
            message: format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::DatabaseManager;
    use chrono::Duration;
    use std::time::Instant;

    async fn service() -> (AccountService, GrantRepository) {
        service_with_cost(4).await
    }

    async fn service_with_cost(cost: u32) -> (AccountService, GrantRepository) {
        let pool = DatabaseManager::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            lookup_timeout_ms: 1000,
        })
        .await
        .unwrap();
        let tokens = Arc::new(TokenService::new(b"account-secret", Duration::hours(24)).unwrap());
        let grants = GrantRepository::new(pool.clone());
        let service =
            AccountService::new(PrincipalRepository::new(pool), grants.clone(), tokens, cost).unwrap();
        (service, grants)
    }

    fn signup(email: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            name: "Ann".to_string(),
            password: "long-enough-password".to_string(),
        }
    }

    fn signin(email: &str, password: &str) -> SigninRequest {
        SigninRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn signup_then_signin_issues_user_token() {
        let (service, _) = service().await;
        let principal = service.signup(&signup("Ann@Example.com")).await.unwrap();
        assert_eq!(principal.email, "ann@example.com");
        assert_ne!(principal.password_hash, "long-enough-password");

        let outcome = service
            .signin(&signin("ann@example.com", "long-enough-password"))
            .await
            .unwrap();
        assert_eq!(outcome.issued.claims.sub, principal.id);
        assert_eq!(outcome.issued.claims.role, DEFAULT_ROLE);
    }

    #[tokio::test]
    async fn granted_principal_gets_elevated_claim() {
        let (service, grants) = service().await;
        let principal = service.signup(&signup("boss@example.com")).await.unwrap();
        grants.create(&principal.id, "superadmin").await.unwrap();

        let outcome = service
            .signin(&signin("boss@example.com", "long-enough-password"))
            .await
            .unwrap();
        assert_eq!(outcome.issued.claims.role, "superadmin");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (service, _) = service().await;
        service.signup(&signup("ann@example.com")).await.unwrap();
        let err = service.signup(&signup(" ANN@example.com ")).await.unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken(email) if email == "ann@example.com"));
    }

    #[tokio::test]
    async fn bad_credentials_look_the_same() {
        let (service, _) = service().await;
        service.signup(&signup("ann@example.com")).await.unwrap();

        let wrong_password = service.signin(&signin("ann@example.com", "nope-nope-nope")).await;
        let unknown_email = service.signin(&signin("bob@example.com", "long-enough-password")).await;

        assert!(matches!(wrong_password, Err(AccountError::Auth(AuthError::InvalidCredentials))));
        assert!(matches!(unknown_email, Err(AccountError::Auth(AuthError::InvalidCredentials))));
    }

    #[tokio::test]
    async fn dummy_hash_uses_configured_cost() {
        let (service, _) = service_with_cost(5).await;
        assert!(service.dummy_hash.starts_with("$2b$05$"), "{}", service.dummy_hash);
    }

    #[tokio::test]
    async fn unknown_email_pays_for_a_hash_check() {
        let (service, _) = service_with_cost(10).await;
        service.signup(&signup("ann@example.com")).await.unwrap();

        let started = Instant::now();
        let _ = service.signin(&signin("ann@example.com", "nope-nope-nope")).await;
        let wrong_password = started.elapsed();

        let started = Instant::now();
        let _ = service.signin(&signin("bob@example.com", "nope-nope-nope")).await;
        let unknown_email = started.elapsed();

        // Without the dummy check the unknown email returns after a single indexed lookup
        assert!(
            unknown_email * 4 >= wrong_password,
            "unknown email took {:?}, wrong password took {:?}",
            unknown_email,
            wrong_password
        );
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let (service, _) = service().await;

        let mut short = signup("ann@example.com");
        short.password = "short".to_string();
        assert!(matches!(
            service.signup(&short).await,
            Err(AccountError::Validation { field: "password", .. })
        ));

        let mut nameless = signup("ann@example.com");
        nameless.name = "   ".to_string();
        assert!(matches!(
            service.signup(&nameless).await,
            Err(AccountError::Validation { field: "name", .. })
        ));
    }

    #[test]
    fn email_format_checks() {
        assert!(validate_email_format("a@b.com").is_ok());
        for bad in ["", "plain", "@b.com", "a@b", "a@.com", "a@b.", "a@b@c.com"] {
            assert!(validate_email_format(bad).is_err(), "{} should be rejected", bad);
        }
    }
}
