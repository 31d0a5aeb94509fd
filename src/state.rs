use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::auth::{AdminRoleResolver, AuthError, Clock, RevocationList, SystemClock, TokenService};
use crate::config::AppConfig;
use crate::database::{DatabaseError, DatabaseManager, GrantRepository, PrincipalRepository};
use crate::services::AccountService;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Shared, cheaply cloneable handles injected into every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: SqlitePool,
    pub tokens: Arc<TokenService>,
    pub resolver: Arc<AdminRoleResolver>,
    pub accounts: Arc<AccountService>,
}

impl AppState {
    /// Connect the credential store and wire the auth services from config
    pub async fn initialize(config: AppConfig) -> Result<Self, StartupError> {
        let pool = DatabaseManager::connect(&config.database).await?;
        Ok(Self::from_parts(config, pool, Arc::new(SystemClock))?)
    }

    pub fn from_parts(
        config: AppConfig,
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let tokens = TokenService::from_config(&config.security)?
            .with_clock(clock)
            .with_revocations(Arc::new(RevocationList::new()));

        let resolver = AdminRoleResolver::new(
            Arc::new(GrantRepository::new(pool.clone())),
            config.security.admin_roles.clone(),
        )
        .with_policy(config.security.admin_policy)
        .with_lookup_timeout(Duration::from_millis(config.database.lookup_timeout_ms));

        let tokens = Arc::new(tokens);
        let accounts = AccountService::new(
            PrincipalRepository::new(pool.clone()),
            GrantRepository::new(pool.clone()),
            tokens.clone(),
            config.security.password_cost,
        )?;

        Ok(Self {
            config: Arc::new(config),
            pool,
            tokens,
            resolver: Arc::new(resolver),
            accounts: Arc::new(accounts),
        })
    }

    pub fn principals(&self) -> PrincipalRepository {
        PrincipalRepository::new(self.pool.clone())
    }

    pub fn grants(&self) -> GrantRepository {
        GrantRepository::new(self.pool.clone())
    }

    pub fn accounts(&self) -> Arc<AccountService> {
        self.accounts.clone()
    }

    /// Cookies get the `Secure` flag whenever HTTPS is required
    pub fn secure_cookies(&self) -> bool {
        self.config.security.require_https
    }
}
