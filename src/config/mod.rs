use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::AdminPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub gate: GateConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Upper bound for a single admin-grant lookup before it counts as unavailable
    pub lookup_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub admin_roles: Vec<String>,
    pub admin_policy: AdminPolicy,
    pub password_cost: u32,
    pub require_https: bool,
    pub enable_audit_logging: bool,
    pub allow_query_token: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub protected_prefix: String,
    pub login_path: String,
    pub api_prefix: String,
    pub cookie_name: String,
    pub cookie_max_age_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in production")]
    MissingSecret,

    #[error("login path '{login}' must live under the protected prefix '{prefix}'")]
    LoginOutsidePrefix { login: String, prefix: String },

    #[error("invalid path setting {name}: '{value}' must start with '/'")]
    InvalidPath { name: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_LOOKUP_TIMEOUT_MS") {
            self.database.lookup_timeout_ms = v.parse().unwrap_or(self.database.lookup_timeout_ms);
        }

        // API overrides
        if let Some(port) = env::var("FINTRACK_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_CORS_ORIGINS") {
            self.api.cors_origins = split_list(&v);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ADMIN_ROLES") {
            self.security.admin_roles = split_list(&v);
        }
        if let Ok(v) = env::var("SECURITY_ADMIN_POLICY") {
            self.security.admin_policy = v.parse().unwrap_or(self.security.admin_policy);
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_COST") {
            self.security.password_cost = v.parse().unwrap_or(self.security.password_cost);
        }
        if let Ok(v) = env::var("SECURITY_REQUIRE_HTTPS") {
            self.security.require_https = v.parse().unwrap_or(self.security.require_https);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }
        if let Ok(v) = env::var("SECURITY_ALLOW_QUERY_TOKEN") {
            self.security.allow_query_token = v.parse().unwrap_or(self.security.allow_query_token);
        }

        // Gate overrides
        if let Ok(v) = env::var("GATE_PROTECTED_PREFIX") {
            self.gate.protected_prefix = v;
        }
        if let Ok(v) = env::var("GATE_LOGIN_PATH") {
            self.gate.login_path = v;
        }
        if let Ok(v) = env::var("GATE_API_PREFIX") {
            self.gate.api_prefix = v;
        }

        self
    }

    /// Check invariants the server relies on and fill in an ephemeral signing
    /// secret outside production. Production without `JWT_SECRET` is an error.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.security.jwt_secret.is_empty() {
            if self.is_production() {
                return Err(ConfigError::MissingSecret);
            }
            tracing::warn!(
                "JWT_SECRET not set; using an ephemeral secret, tokens will not survive a restart"
            );
            self.security.jwt_secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        }

        for (name, value) in [
            ("protected_prefix", &self.gate.protected_prefix),
            ("login_path", &self.gate.login_path),
            ("api_prefix", &self.gate.api_prefix),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::InvalidPath { name, value: value.clone() });
            }
        }

        let prefix = self.gate.protected_prefix.trim_end_matches('/');
        if !self.gate.login_path.starts_with(&format!("{}/", prefix)) {
            return Err(ConfigError::LoginOutsidePrefix {
                login: self.gate.login_path.clone(),
                prefix: self.gate.protected_prefix.clone(),
            });
        }

        Ok(self)
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: "sqlite://fintrack.db".to_string(),
                max_connections: 5,
                lookup_timeout_ms: 2000,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                cors_origins: vec![],
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                admin_roles: default_admin_roles(),
                admin_policy: AdminPolicy::ClaimWins,
                password_cost: 10,
                require_https: false,
                enable_audit_logging: true,
                allow_query_token: true,
            },
            gate: GateConfig::default(),
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: "sqlite://fintrack.db".to_string(),
                max_connections: 10,
                lookup_timeout_ms: 1000,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                cors_origins: vec!["https://staging.fintrack.app".to_string()],
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                admin_roles: default_admin_roles(),
                admin_policy: AdminPolicy::ClaimWins,
                password_cost: bcrypt::DEFAULT_COST,
                require_https: true,
                enable_audit_logging: true,
                allow_query_token: true,
            },
            gate: GateConfig::default(),
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: "sqlite://fintrack.db".to_string(),
                max_connections: 20,
                lookup_timeout_ms: 500,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                cors_origins: vec!["https://fintrack.app".to_string()],
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                admin_roles: default_admin_roles(),
                admin_policy: AdminPolicy::ClaimWins,
                password_cost: bcrypt::DEFAULT_COST,
                require_https: true,
                enable_audit_logging: true,
                allow_query_token: false,
            },
            gate: GateConfig::default(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            protected_prefix: "/admin".to_string(),
            login_path: "/admin/login".to_string(),
            api_prefix: "/api".to_string(),
            cookie_name: "auth-token".to_string(),
            cookie_max_age_secs: 86_400,
        }
    }
}

fn default_admin_roles() -> Vec<String> {
    vec!["admin".to_string(), "superadmin".to_string()]
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
