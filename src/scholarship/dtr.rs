/// Daily time record management
use crate::{
    db::models::DtrEntry,
    error::{AppError, AppResult},
    scholarship::Status,
};
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

const DTR_COLUMNS: &str =
    "id, application_id, entry_date, time_in, time_out, remarks, created_at";

/// DTR manager service
#[derive(Clone)]
pub struct DtrManager {
    db: SqlitePool,
}

impl DtrManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record a time-in for a date. Only deployed trainees can punch,
    /// and a day admits a single entry.
    pub async fn time_in(&self, application_id: &str, entry_date: NaiveDate) -> AppResult<DtrEntry> {
        self.require_deployed(application_id).await?;

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM dtr_entry WHERE application_id = ?1 AND entry_date = ?2",
        )
        .bind(application_id)
        .bind(entry_date)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        if existing > 0 {
            return Err(AppError::Conflict(format!(
                "Time-in already recorded for {}",
                entry_date
            )));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO dtr_entry (id, application_id, entry_date, time_in, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(application_id)
        .bind(entry_date)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        self.get(&id).await
    }

    /// Record a time-out against the day's open time-in
    pub async fn time_out(&self, application_id: &str, entry_date: NaiveDate) -> AppResult<DtrEntry> {
        let entry = sqlx::query_as::<_, DtrEntry>(&format!(
            "SELECT {} FROM dtr_entry WHERE application_id = ?1 AND entry_date = ?2",
            DTR_COLUMNS
        ))
        .bind(application_id)
        .bind(entry_date)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("No time-in recorded for {}", entry_date)))?;

        if entry.time_out.is_some() {
            return Err(AppError::Conflict(format!(
                "Time-out already recorded for {}",
                entry_date
            )));
        }

        sqlx::query("UPDATE dtr_entry SET time_out = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(&entry.id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        self.get(&entry.id).await
    }

    /// Get one entry
    pub async fn get(&self, id: &str) -> AppResult<DtrEntry> {
        sqlx::query_as::<_, DtrEntry>(&format!(
            "SELECT {} FROM dtr_entry WHERE id = ?1",
            DTR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("DTR entry not found".to_string()))
    }

    /// List entries for an application, newest date first
    pub async fn list_for_application(&self, application_id: &str) -> AppResult<Vec<DtrEntry>> {
        sqlx::query_as::<_, DtrEntry>(&format!(
            "SELECT {} FROM dtr_entry WHERE application_id = ?1 ORDER BY entry_date DESC",
            DTR_COLUMNS
        ))
        .bind(application_id)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)
    }

    /// Attach reviewer remarks to an entry
    pub async fn add_remarks(&self, id: &str, remarks: &str) -> AppResult<DtrEntry> {
        let result = sqlx::query("UPDATE dtr_entry SET remarks = ?1 WHERE id = ?2")
            .bind(remarks)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("DTR entry not found".to_string()));
        }

        self.get(id).await
    }

    async fn require_deployed(&self, application_id: &str) -> AppResult<()> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM application WHERE id = ?1")
                .bind(application_id)
                .fetch_optional(&self.db)
                .await
                .map_err(AppError::Database)?;

        let status = status.ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        if Status::parse(&status)? != Status::Deployed {
            return Err(AppError::Validation(
                "Only deployed trainees can record time".to_string(),
            ));
        }

        Ok(())
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

    #[tokio::test]
    async fn test_time_in_and_out() {
        let pool = test_pool().await;
        let app_id = deployed_application(&pool).await;
        let manager = DtrManager::new(pool);

        let today = Utc::now().date_naive();
        let entry = manager.time_in(&app_id, today).await.unwrap();
        assert!(entry.time_in.is_some());
        assert!(entry.time_out.is_none());

        // Duplicate time-in for the same day
        let result = manager.time_in(&app_id, today).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let closed = manager.time_out(&app_id, today).await.unwrap();
        assert!(closed.time_out.is_some());

        // Duplicate time-out
        let result = manager.time_out(&app_id, today).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_time_out_without_time_in() {
        let pool = test_pool().await;
        let app_id = deployed_application(&pool).await;
        let manager = DtrManager::new(pool);

        let result = manager.time_out(&app_id, Utc::now().date_naive()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_punch_requires_deployed() {
        let pool = test_pool().await;
        seed_account(&pool, "student-2").await;
        let apps = ApplicationManager::new(pool.clone());
        let app = apps.submit("student-2", "BS IT", 2, None, None).await.unwrap();
        let manager = DtrManager::new(pool);

        let result = manager.time_in(&app.id, Utc::now().date_naive()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_remarks_and_listing() {
        let pool = test_pool().await;
        let app_id = deployed_application(&pool).await;
        let manager = DtrManager::new(pool);

        let d1 = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        let entry = manager.time_in(&app_id, d1).await.unwrap();
        manager.time_in(&app_id, d2).await.unwrap();

        let updated = manager.add_remarks(&entry.id, "late by 10 minutes").await.unwrap();
        assert_eq!(updated.remarks.as_deref(), Some("late by 10 minutes"));

        let entries = manager.list_for_application(&app_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_date, d2);
    }
}
