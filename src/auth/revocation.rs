use std::collections::HashMap;

use tokio::sync::RwLock;

use super::Claims;

/// In-process set of revoked token IDs.
///
/// Each entry remembers the expiry of the token it revokes; once that passes
/// the token would be rejected anyway, so the entry is dropped on the next write.
#[derive(Default)]
pub struct RevocationList {
    entries: RwLock<HashMap<String, i64>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn revoke(&self, claims: &Claims, now: i64) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, exp| *exp > now);
        if claims.exp > now {
            entries.insert(claims.jti.clone(), claims.exp);
        }
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.entries.read().await.contains_key(jti)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
