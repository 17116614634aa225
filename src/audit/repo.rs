use async_trait::async_trait;

use super::repo_types::{AuditLogEntry, NewAuditEntry};
use crate::db::PgStore;

#[async_trait]
pub trait AuditRepo: Send + Sync {
    async fn insert_audit(&self, entry: &NewAuditEntry) -> anyhow::Result<()>;
    async fn list_audit(&self, limit: i64) -> anyhow::Result<Vec<AuditLogEntry>>;
}

#[async_trait]
impl AuditRepo for PgStore {
    async fn insert_audit(&self, entry: &NewAuditEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, action, entity, entity_id, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.action.as_str())
        .bind(entry.entity.as_str())
        .bind(entry.entity_id)
        .bind(&entry.details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_audit(&self, limit: i64) -> anyhow::Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, user_id, action, entity, entity_id, details, created_at
              FROM audit_logs
             ORDER BY created_at DESC
             LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
