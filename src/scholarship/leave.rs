/// Leave request management
use crate::{
    db::models::LeaveRequest,
    error::{AppError, AppResult},
    scholarship::Status,
};
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

const LEAVE_COLUMNS: &str =
    "id, application_id, date_from, date_to, reason, status, decided_by, decided_at,
     created_at, updated_at";

/// Leave manager service
#[derive(Clone)]
pub struct LeaveManager {
    db: SqlitePool,
}

impl LeaveManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// File a leave request for a deployed trainee
    pub async fn file(
        &self,
        application_id: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
        reason: &str,
    ) -> AppResult<LeaveRequest> {
        if date_to < date_from {
            return Err(AppError::Validation(
                "Leave end date precedes start date".to_string(),
            ));
        }

        if reason.trim().is_empty() {
            return Err(AppError::Validation("Leave reason cannot be empty".to_string()));
        }

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM application WHERE id = ?1")
                .bind(application_id)
                .fetch_optional(&self.db)
                .await
                .map_err(AppError::Database)?;

        let status = status.ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;
        if Status::parse(&status)? != Status::Deployed {
            return Err(AppError::Validation(
                "Only deployed trainees can file leave".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO leave_request (id, application_id, date_from, date_to, reason, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&id)
        .bind(application_id)
        .bind(date_from)
        .bind(date_to)
        .bind(reason)
        .bind("pending")
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(application_id, leave_id = %id, "Leave request filed");

        self.get(&id).await
    }

    /// Get one leave request
    pub async fn get(&self, id: &str) -> AppResult<LeaveRequest> {
        sqlx::query_as::<_, LeaveRequest>(&format!(
            "SELECT {} FROM leave_request WHERE id = ?1",
            LEAVE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Leave request not found".to_string()))
    }

    /// List leave requests for an application
    pub async fn list_for_application(&self, application_id: &str) -> AppResult<Vec<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequest>(&format!(
            "SELECT {} FROM leave_request WHERE application_id = ?1 ORDER BY created_at DESC",
            LEAVE_COLUMNS
        ))
        .bind(application_id)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)
    }

    /// List pending leave requests (reviewer work queue)
    pub async fn list_pending(&self) -> AppResult<Vec<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequest>(&format!(
            "SELECT {} FROM leave_request WHERE status = 'pending' ORDER BY created_at",
            LEAVE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)
    }

    /// Approve or disapprove a pending leave request. Decisions are final.
    pub async fn decide(
        &self,
        id: &str,
        approve: bool,
        decided_by: &str,
    ) -> AppResult<LeaveRequest> {
        let leave = self.get(id).await?;

        if leave.status != "pending" {
            return Err(AppError::Conflict(format!(
                "Leave request already {}",
                leave.status
            )));
        }

        let status = if approve { "approved" } else { "disapproved" };
        let now = Utc::now();

        sqlx::query(
            "UPDATE leave_request SET status = ?1, decided_by = ?2, decided_at = ?3, updated_at = ?4
             WHERE id = ?5",
        )
        .bind(status)
        .bind(decided_by)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(leave_id = id, status, decided_by, "Leave request decided");

        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_account, test_pool};
    use crate::scholarship::ApplicationManager;

    async fn deployed_application(pool: &SqlitePool) -> String {
        seed_account(pool, "student-1").await;
        let apps = ApplicationManager::new(pool.clone());
        let app = apps.submit("student-1", "BS IT", 2, None, None).await.unwrap();
        for next in [
            Status::Shortlisted,
            Status::ForInterview,
            Status::Interviewed,
            Status::Approved,
        ] {
            apps.advance_status(&app.id, next, None).await.unwrap();
        }
        apps.deploy(&app.id, "office-1").await.unwrap();
        app.id
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_file_and_decide() {
        let pool = test_pool().await;
        let app_id = deployed_application(&pool).await;
        let manager = LeaveManager::new(pool);

        let leave = manager
            .file(&app_id, d(2026, 9, 1), d(2026, 9, 3), "medical appointment")
            .await
            .unwrap();
        assert_eq!(leave.status, "pending");

        let decided = manager.decide(&leave.id, true, "profile-1").await.unwrap();
        assert_eq!(decided.status, "approved");
        assert_eq!(decided.decided_by.as_deref(), Some("profile-1"));
        assert!(decided.decided_at.is_some());

        // Decisions are final
        let result = manager.decide(&leave.id, false, "profile-1").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_disapprove() {
        let pool = test_pool().await;
        let app_id = deployed_application(&pool).await;
        let manager = LeaveManager::new(pool);

        let leave = manager
            .file(&app_id, d(2026, 9, 1), d(2026, 9, 1), "personal")
            .await
            .unwrap();

        let decided = manager.decide(&leave.id, false, "hr-1").await.unwrap();
        assert_eq!(decided.status, "disapproved");
    }

    #[tokio::test]
    async fn test_date_range_validation() {
        let pool = test_pool().await;
        let app_id = deployed_application(&pool).await;
        let manager = LeaveManager::new(pool);

        let result = manager
            .file(&app_id, d(2026, 9, 3), d(2026, 9, 1), "backwards")
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_requires_deployed_application() {
        let pool = test_pool().await;
        seed_account(&pool, "student-2").await;
        let apps = ApplicationManager::new(pool.clone());
        let app = apps.submit("student-2", "BS IT", 2, None, None).await.unwrap();
        let manager = LeaveManager::new(pool);

        let result = manager
            .file(&app.id, d(2026, 9, 1), d(2026, 9, 2), "reason")
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_pending_queue() {
        let pool = test_pool().await;
        let app_id = deployed_application(&pool).await;
        let manager = LeaveManager::new(pool);

        let first = manager
            .file(&app_id, d(2026, 9, 1), d(2026, 9, 1), "a")
            .await
            .unwrap();
        manager.file(&app_id, d(2026, 10, 1), d(2026, 10, 2), "b").await.unwrap();

        manager.decide(&first.id, true, "hr-1").await.unwrap();

        let pending = manager.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);

        let all = manager.list_for_application(&app_id).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
