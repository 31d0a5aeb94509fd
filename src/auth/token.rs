use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthError, InvalidTokenReason, RevocationList};
use crate::config::SecurityConfig;

/// Source of "now" for issuing and expiring tokens
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used to simulate expiry.
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst))
            .single()
            .unwrap_or_default()
    }
}

/// Identity a token is issued for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_id: String,
    pub email: String,
    pub role: String,
}

/// JWT claims carried by every bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal ID)
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token ID, the key used for revocation
    pub jti: String,
}

impl Claims {
    pub fn subject(&self) -> Subject {
        Subject {
            subject_id: self.sub.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_in(&self) -> i64 {
        self.claims.exp - self.claims.iat
    }
}

/// Issues and verifies HS256 bearer tokens with a key fixed at construction
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    revocations: Option<Arc<RevocationList>>,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration("JWT secret is empty".to_string()));
        }
        if ttl <= Duration::zero() {
            return Err(AuthError::Configuration("token lifetime must be positive".to_string()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            clock: Arc::new(SystemClock),
            revocations: None,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, AuthError> {
        let ttl = i64::try_from(security.jwt_expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(|| {
                AuthError::Configuration(format!(
                    "token lifetime of {} hours is out of range",
                    security.jwt_expiry_hours
                ))
            })?;
        Self::new(security.jwt_secret.as_bytes(), ttl)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_revocations(mut self, revocations: Arc<RevocationList>) -> Self {
        self.revocations = Some(revocations);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn issue(&self, subject: &Subject) -> Result<IssuedToken, AuthError> {
        let now = self.clock.now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Configuration("token expiry is out of range".to_string()))?;
        let claims = Claims {
            sub: subject.subject_id.clone(),
            email: subject.email.clone(),
            role: subject.role.clone(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Configuration(format!("failed to sign token: {}", e)))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify signature, structure and expiry. Never touches the datastore.
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(AuthError::InvalidToken(InvalidTokenReason::Malformed));
        }

        // Expiry is checked against our own clock below
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidToken(InvalidTokenReason::BadSignature),
                _ => AuthError::InvalidToken(InvalidTokenReason::Malformed),
            })?
            .claims;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(AuthError::InvalidToken(InvalidTokenReason::Expired));
        }

        if let Some(revocations) = &self.revocations {
            if revocations.is_revoked(&claims.jti).await {
                return Err(AuthError::InvalidToken(InvalidTokenReason::Revoked));
            }
        }

        Ok(claims)
    }

    /// Add the token to the revocation list, if one is attached
    pub async fn revoke(&self, claims: &Claims) -> bool {
        match &self.revocations {
            Some(revocations) => {
                revocations.revoke(claims, self.clock.now().timestamp()).await;
                true
            }
            None => false,
        }
    }
}
