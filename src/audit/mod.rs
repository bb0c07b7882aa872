/// Append-only audit log
///
/// Sensitive mutations record who did what, with before/after snapshots.
/// Writes are best effort: a failed insert is logged and swallowed so it
/// never blocks the primary operation.

use crate::db::models::AuditLog;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;

/// Identity of the actor performing an audited action
#[derive(Debug, Clone)]
pub struct Actor {
    pub account_id: String,
    pub profile_id: Option<String>,
}

/// Audit log manager
#[derive(Clone)]
pub struct AuditLogManager {
    db: SqlitePool,
}

impl AuditLogManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record an audit entry. Never fails: insert errors are logged at
    /// WARN and dropped.
    pub async fn record(
        &self,
        actor: &Actor,
        action: &str,
        module: &str,
        before: Option<&Value>,
        after: Option<&Value>,
    ) {
        let result = sqlx::query(
            "INSERT INTO audit_log (actor_account_id, actor_profile_id, action, module, before_value, after_value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&actor.account_id)
        .bind(&actor.profile_id)
        .bind(action)
        .bind(module)
        .bind(before.map(|v| v.to_string()))
        .bind(after.map(|v| v.to_string()))
        .bind(Utc::now())
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            tracing::warn!(action, module, "Audit log write failed: {}", e);
        }
    }

    /// List entries newest first, cursored by id
    pub async fn list(&self, cursor: Option<i64>, limit: i64) -> AppResult<Vec<AuditLog>> {
        let limit = limit.clamp(1, 200);

        let rows = match cursor {
            Some(cursor) => {
                sqlx::query_as::<_, AuditLog>(
                    "SELECT id, actor_account_id, actor_profile_id, action, module,
                            before_value, after_value, created_at
                     FROM audit_log WHERE id < ?1 ORDER BY id DESC LIMIT ?2",
                )
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.db)
                .await
            }
            None => {
                sqlx::query_as::<_, AuditLog>(
                    "SELECT id, actor_account_id, actor_profile_id, action, module,
                            before_value, after_value, created_at
                     FROM audit_log ORDER BY id DESC LIMIT ?1",
                )
                .bind(limit)
                .fetch_all(&self.db)
                .await
            }
        };

        rows.map_err(AppError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use serde_json::json;

    fn actor(id: &str) -> Actor {
        Actor {
            account_id: id.to_string(),
            profile_id: None,
        }
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let manager = AuditLogManager::new(test_pool().await);

        manager
            .record(
                &actor("hr-1"),
                "status_change",
                "applications",
                Some(&json!({"status": "pending"})),
                Some(&json!({"status": "rejected"})),
            )
            .await;
        manager
            .record(&actor("hr-1"), "deploy", "applications", None, None)
            .await;

        let entries = manager.list(None, 50).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert_eq!(entries[0].action, "deploy");
        assert_eq!(entries[1].before_value.as_deref(), Some(r#"{"status":"pending"}"#));
    }

    #[tokio::test]
    async fn test_cursor_pagination() {
        let manager = AuditLogManager::new(test_pool().await);

        for i in 0..5 {
            manager
                .record(&actor("hr-1"), &format!("action-{}", i), "test", None, None)
                .await;
        }

        let first_page = manager.list(None, 2).await.unwrap();
        assert_eq!(first_page.len(), 2);

        let second_page = manager.list(Some(first_page[1].id), 2).await.unwrap();
        assert_eq!(second_page.len(), 2);
        assert!(second_page[0].id < first_page[1].id);
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let pool = test_pool().await;
        // Break the table so the insert fails
        sqlx::query("DROP TABLE audit_log").execute(&pool).await.unwrap();

        let manager = AuditLogManager::new(pool);
        // Must not panic or surface the error
        manager.record(&actor("hr-1"), "noop", "test", None, None).await;
    }
}
