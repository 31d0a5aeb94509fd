use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Elevated role held by a principal. Provisioned out of band.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminGrant {
    pub id: String,
    pub principal_id: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}
