//! Keyed hand-off of large JSON results with expiry.
//!
//! A sync run stores its full report under a generated key; consumers
//! fetch it later by key instead of carrying the payload around.
//! Expired entries are deleted on read.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

#[async_trait]
pub trait ClaimCheckStore: Send + Sync {
    async fn put_json(&self, key: &str, value: &serde_json::Value, ttl_secs: i64) -> Result<()>;
    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>>;
}

pub struct SqliteClaimCheck {
    pool: SqlitePool,
}

impl SqliteClaimCheck {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClaimCheckStore for SqliteClaimCheck {
    async fn put_json(&self, key: &str, value: &serde_json::Value, ttl_secs: i64) -> Result<()> {
        let expires_at = chrono::Utc::now().timestamp() + ttl_secs;
        sqlx::query(
            r#"
            INSERT INTO claim_checks (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value.to_string())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>> {
        use sqlx::Row;

        let row = sqlx::query("SELECT value, expires_at FROM claim_checks WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: i64 = row.get("expires_at");
        if expires_at <= chrono::Utc::now().timestamp() {
            sqlx::query("DELETE FROM claim_checks WHERE key = ?")
                .bind(key)
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        let raw: String = row.get("value");
        Ok(Some(serde_json::from_str(&raw)?))
    }
}
