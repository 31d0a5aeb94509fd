use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AuthError, Claims};
use crate::audit::{self, AuditEvent};
use crate::database::models::AdminGrant;
use crate::database::DatabaseError;

/// Read access to admin grants, keyed by principal ID
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn find_grant(&self, principal_id: &str) -> Result<Option<AdminGrant>, DatabaseError>;
}

/// How an elevated role claim relates to the grant table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPolicy {
    /// A recognized elevated role claim is enough; the grant table is only
    /// consulted for other roles.
    ClaimWins,
    /// Every check hits the grant table. An elevated claim with no grant row
    /// counts as revoked.
    GrantAuthoritative,
}

impl FromStr for AdminPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claim" | "claim_wins" => Ok(AdminPolicy::ClaimWins),
            "grant" | "grant_authoritative" => Ok(AdminPolicy::GrantAuthoritative),
            other => Err(format!("unknown admin policy '{}'", other)),
        }
    }
}

/// Decides whether verified claims carry admin privilege
pub struct AdminRoleResolver {
    store: Arc<dyn GrantStore>,
    elevated_roles: Vec<String>,
    policy: AdminPolicy,
    lookup_timeout: Duration,
}

impl AdminRoleResolver {
    pub fn new(store: Arc<dyn GrantStore>, elevated_roles: Vec<String>) -> Self {
        Self {
            store,
            elevated_roles,
            policy: AdminPolicy::ClaimWins,
            lookup_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_policy(mut self, policy: AdminPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn is_elevated_role(&self, role: &str) -> bool {
        self.elevated_roles
            .iter()
            .any(|r| r.eq_ignore_ascii_case(role.trim()))
    }

    /// Admin check that fails closed: a store error answers `false`.
    pub async fn is_admin(&self, claims: &Claims) -> bool {
        match self.resolve(claims).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                audit::record(
                    AuditEvent::StoreUnavailable,
                    Some(&claims.sub),
                    &format!("admin check denied: {}", e),
                );
                false
            }
        }
    }

    /// Like `is_admin`, but reports why access was refused
    pub async fn check(&self, claims: &Claims) -> Result<(), AuthError> {
        match self.resolve(claims).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AuthError::InsufficientPrivilege),
            Err(e) => {
                audit::record(AuditEvent::StoreUnavailable, Some(&claims.sub), &e.to_string());
                Err(e)
            }
        }
    }

    async fn resolve(&self, claims: &Claims) -> Result<bool, AuthError> {
        let claim_elevated = self.is_elevated_role(&claims.role);

        match self.policy {
            AdminPolicy::ClaimWins => {
                if claim_elevated {
                    return Ok(true);
                }
                Ok(self.lookup(&claims.sub).await?.is_some())
            }
            AdminPolicy::GrantAuthoritative => {
                let granted = self.lookup(&claims.sub).await?.is_some();
                if claim_elevated && !granted {
                    tracing::warn!(
                        "Role claim '{}' for '{}' has no matching grant; treating as revoked",
                        claims.role,
                        claims.sub
                    );
                }
                Ok(granted)
            }
        }
    }

    async fn lookup(&self, principal_id: &str) -> Result<Option<AdminGrant>, AuthError> {
        match tokio::time::timeout(self.lookup_timeout, self.store.find_grant(principal_id)).await {
            Ok(Ok(grant)) => Ok(grant),
            Ok(Err(e)) => Err(AuthError::StoreUnavailable(e.to_string())),
            Err(_) => Err(AuthError::StoreUnavailable(format!(
                "grant lookup exceeded {:?}",
                self.lookup_timeout
            ))),
        }
    }
}
