use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::GrantStore;
use crate::database::manager::DatabaseError;
use crate::database::models::{normalize_email, AdminGrant, Principal};

#[derive(Clone)]
pub struct PrincipalRepository {
    pool: SqlitePool,
}

impl PrincipalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<Principal, DatabaseError> {
        let principal = Principal {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            name: name.trim().to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO principals (id, email, name, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&principal.id)
        .bind(&principal.email)
        .bind(&principal.name)
        .bind(&principal.password_hash)
        .bind(principal.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, format!("email '{}' already registered", principal.email)))?;

        Ok(principal)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DatabaseError> {
        let principal = sqlx::query_as::<_, Principal>(
            "SELECT id, email, name, password_hash, created_at
             FROM principals
             WHERE email = ?",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, DatabaseError> {
        let principal = sqlx::query_as::<_, Principal>(
            "SELECT id, email, name, password_hash, created_at
             FROM principals
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    pub async fn require_by_email(&self, email: &str) -> Result<Principal, DatabaseError> {
        self.find_by_email(email)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("no principal with email '{}'", normalize_email(email))))
    }
}

#[derive(Clone)]
pub struct GrantRepository {
    pool: SqlitePool,
}

impl GrantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, principal_id: &str, role: &str) -> Result<AdminGrant, DatabaseError> {
        let grant = AdminGrant {
            id: Uuid::new_v4().to_string(),
            principal_id: principal_id.to_string(),
            role: role.trim().to_lowercase(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO admin_grants (id, principal_id, role, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&grant.id)
        .bind(&grant.principal_id)
        .bind(&grant.role)
        .bind(grant.created_at)
        .execute(&self.pool)
        .await?;

        Ok(grant)
    }

    /// Remove every grant held by the principal, returning how many were dropped
    pub async fn revoke(&self, principal_id: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM admin_grants WHERE principal_id = ?")
            .bind(principal_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// First grant for the principal; the schema allows duplicates but callers expect one
    pub async fn find_by_principal(&self, principal_id: &str) -> Result<Option<AdminGrant>, DatabaseError> {
        let grant = sqlx::query_as::<_, AdminGrant>(
            "SELECT id, principal_id, role, created_at
             FROM admin_grants
             WHERE principal_id = ?
             ORDER BY created_at ASC
             LIMIT 1",
        )
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(grant)
    }

    pub async fn list(&self) -> Result<Vec<AdminGrant>, DatabaseError> {
        let grants = sqlx::query_as::<_, AdminGrant>(
            "SELECT id, principal_id, role, created_at
             FROM admin_grants
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }
}

#[async_trait]
impl GrantStore for GrantRepository {
    async fn find_grant(&self, principal_id: &str) -> Result<Option<AdminGrant>, DatabaseError> {
        self.find_by_principal(principal_id).await
    }
}
