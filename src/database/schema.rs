use sqlx::SqlitePool;

use super::DatabaseError;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS principals (
        id            TEXT PRIMARY KEY NOT NULL,
        email         TEXT NOT NULL UNIQUE,
        name          TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        created_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS admin_grants (
        id           TEXT PRIMARY KEY NOT NULL,
        principal_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
        role         TEXT NOT NULL,
        created_at   TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_admin_grants_principal ON admin_grants(principal_id)",
];

/// Create tables and indexes if they are missing
pub async fn install(pool: &SqlitePool) -> Result<(), DatabaseError> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
