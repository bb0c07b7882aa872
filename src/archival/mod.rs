/// Archival and retention pipeline
///
/// Terminal-negative records (rejected applications and re-applications,
/// disapproved leave requests) older than one year are copied wholesale
/// into parallel archive tables, tagged with a semester label and a
/// deletion date two years out, and removed from the live tables. A
/// second pass hard-deletes archive rows past their deletion date.
///
/// The only idempotence guarantee is the duplicate-check on the source
/// id before insert; no transaction wraps the copy+delete pair.

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Datelike, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Counts reported by one archival run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivalReport {
    pub applications_archived: u64,
    pub re_applications_archived: u64,
    pub leaves_archived: u64,
    pub purged: u64,
    pub failed: u64,
}

/// Archival manager service
#[derive(Clone)]
pub struct ArchivalManager {
    db: SqlitePool,
}

impl ArchivalManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Run the full pipeline: archive pass over the three record kinds,
    /// then purge archive rows past their deletion date. Per-record
    /// failures are counted, never retried, and never abort the run.
    pub async fn run(&self) -> AppResult<ArchivalReport> {
        let now = Utc::now();
        let cutoff = now - Months::new(12);
        let delete_after = now + Months::new(24);

        let mut report = ArchivalReport::default();

        self.archive_applications(cutoff, delete_after, &mut report).await?;
        self.archive_reapplications(cutoff, delete_after, &mut report).await?;
        self.archive_leaves(cutoff, delete_after, &mut report).await?;

        report.purged = self.purge_expired(now).await?;

        tracing::info!(
            applications = report.applications_archived,
            re_applications = report.re_applications_archived,
            leaves = report.leaves_archived,
            purged = report.purged,
            failed = report.failed,
            "Archival run finished"
        );

        Ok(report)
    }

    async fn archive_applications(
        &self,
        cutoff: DateTime<Utc>,
        delete_after: DateTime<Utc>,
        report: &mut ArchivalReport,
    ) -> AppResult<()> {
        let rows = sqlx::query(
            "SELECT id FROM application WHERE status = 'rejected' AND updated_at < ?1",
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)?;

        for row in rows {
            let id: String = row.try_get("id")?;
            match self.archive_one_application(&id, delete_after).await {
                Ok(true) => report.applications_archived += 1,
                Ok(false) => {} // already archived, skipped
                Err(e) => {
                    tracing::warn!(application_id = %id, "Failed to archive application: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(())
    }

    /// Archive a single application. Returns false when the archive
    /// already holds the source id.
    async fn archive_one_application(
        &self,
        id: &str,
        delete_after: DateTime<Utc>,
    ) -> AppResult<bool> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM archived_application WHERE source_id = ?1",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        if exists > 0 {
            tracing::debug!(application_id = id, "Already archived, skipping");
            return Ok(false);
        }

        let row = sqlx::query(
            "SELECT account_id, course, year_level, grade_file, signature_file, status,
                    office_id, interview_at, remarks, created_at, updated_at
             FROM application WHERE id = ?1",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
        let label = semester_label(updated_at);
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO archived_application
                 (id, source_id, account_id, course, year_level, grade_file, signature_file,
                  status, office_id, interview_at, remarks, semester_label, archived_at,
                  delete_after, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id)
        .bind(row.try_get::<String, _>("account_id")?)
        .bind(row.try_get::<String, _>("course")?)
        .bind(row.try_get::<i64, _>("year_level")?)
        .bind(row.try_get::<Option<String>, _>("grade_file")?)
        .bind(row.try_get::<Option<String>, _>("signature_file")?)
        .bind(row.try_get::<String, _>("status")?)
        .bind(row.try_get::<Option<String>, _>("office_id")?)
        .bind(row.try_get::<Option<DateTime<Utc>>, _>("interview_at")?)
        .bind(row.try_get::<Option<String>, _>("remarks")?)
        .bind(&label)
        .bind(now)
        .bind(delete_after)
        .bind(row.try_get::<DateTime<Utc>, _>("created_at")?)
        .bind(updated_at)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        sqlx::query("DELETE FROM application WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        tracing::info!(application_id = id, semester = %label, "Application archived");

        Ok(true)
    }

    async fn archive_reapplications(
        &self,
        cutoff: DateTime<Utc>,
        delete_after: DateTime<Utc>,
        report: &mut ArchivalReport,
    ) -> AppResult<()> {
        let rows = sqlx::query(
            "SELECT id FROM re_application WHERE status = 'rejected' AND updated_at < ?1",
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)?;

        for row in rows {
            let id: String = row.try_get("id")?;
            match self.archive_one_reapplication(&id, delete_after).await {
                Ok(true) => report.re_applications_archived += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(re_application_id = %id, "Failed to archive re-application: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(())
    }

    async fn archive_one_reapplication(
        &self,
        id: &str,
        delete_after: DateTime<Utc>,
    ) -> AppResult<bool> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM archived_re_application WHERE source_id = ?1",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        if exists > 0 {
            tracing::debug!(re_application_id = id, "Already archived, skipping");
            return Ok(false);
        }

        let row = sqlx::query(
            "SELECT account_id, previous_application_id, course, year_level, grade_file,
                    signature_file, status, office_id, interview_at, remarks, created_at, updated_at
             FROM re_application WHERE id = ?1",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
        let label = semester_label(updated_at);

        sqlx::query(
            "INSERT INTO archived_re_application
                 (id, source_id, account_id, previous_application_id, course, year_level,
                  grade_file, signature_file, status, office_id, interview_at, remarks,
                  semester_label, archived_at, delete_after, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id)
        .bind(row.try_get::<String, _>("account_id")?)
        .bind(row.try_get::<String, _>("previous_application_id")?)
        .bind(row.try_get::<String, _>("course")?)
        .bind(row.try_get::<i64, _>("year_level")?)
        .bind(row.try_get::<Option<String>, _>("grade_file")?)
        .bind(row.try_get::<Option<String>, _>("signature_file")?)
        .bind(row.try_get::<String, _>("status")?)
        .bind(row.try_get::<Option<String>, _>("office_id")?)
        .bind(row.try_get::<Option<DateTime<Utc>>, _>("interview_at")?)
        .bind(row.try_get::<Option<String>, _>("remarks")?)
        .bind(&label)
        .bind(Utc::now())
        .bind(delete_after)
        .bind(row.try_get::<DateTime<Utc>, _>("created_at")?)
        .bind(updated_at)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        sqlx::query("DELETE FROM re_application WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        tracing::info!(re_application_id = id, semester = %label, "Re-application archived");

        Ok(true)
    }

    async fn archive_leaves(
        &self,
        cutoff: DateTime<Utc>,
        delete_after: DateTime<Utc>,
        report: &mut ArchivalReport,
    ) -> AppResult<()> {
        let rows = sqlx::query(
            "SELECT id FROM leave_request WHERE status = 'disapproved' AND updated_at < ?1",
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)?;

        for row in rows {
            let id: String = row.try_get("id")?;
            match self.archive_one_leave(&id, delete_after).await {
                Ok(true) => report.leaves_archived += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(leave_id = %id, "Failed to archive leave request: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(())
    }

    async fn archive_one_leave(&self, id: &str, delete_after: DateTime<Utc>) -> AppResult<bool> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM archived_leave_request WHERE source_id = ?1",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        if exists > 0 {
            tracing::debug!(leave_id = id, "Already archived, skipping");
            return Ok(false);
        }

        let row = sqlx::query(
            "SELECT application_id, date_from, date_to, reason, status, decided_by, decided_at,
                    created_at, updated_at
             FROM leave_request WHERE id = ?1",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
        let label = semester_label(updated_at);

        sqlx::query(
            "INSERT INTO archived_leave_request
                 (id, source_id, application_id, date_from, date_to, reason, status,
                  decided_by, decided_at, semester_label, archived_at, delete_after,
                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id)
        .bind(row.try_get::<String, _>("application_id")?)
        .bind(row.try_get::<chrono::NaiveDate, _>("date_from")?)
        .bind(row.try_get::<chrono::NaiveDate, _>("date_to")?)
        .bind(row.try_get::<String, _>("reason")?)
        .bind(row.try_get::<String, _>("status")?)
        .bind(row.try_get::<Option<String>, _>("decided_by")?)
        .bind(row.try_get::<Option<DateTime<Utc>>, _>("decided_at")?)
        .bind(&label)
        .bind(Utc::now())
        .bind(delete_after)
        .bind(row.try_get::<DateTime<Utc>, _>("created_at")?)
        .bind(updated_at)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        sqlx::query("DELETE FROM leave_request WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        tracing::info!(leave_id = id, semester = %label, "Leave request archived");

        Ok(true)
    }

    /// List archived applications, newest archive first
    pub async fn list_archived_applications(
        &self,
    ) -> AppResult<Vec<crate::db::models::ArchivedApplication>> {
        sqlx::query_as(
            "SELECT id, source_id, account_id, course, year_level, grade_file, signature_file,
                    status, office_id, interview_at, remarks, semester_label, archived_at,
                    delete_after, created_at, updated_at
             FROM archived_application ORDER BY archived_at DESC",
        )
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)
    }

    /// List archived re-applications
    pub async fn list_archived_reapplications(
        &self,
    ) -> AppResult<Vec<crate::db::models::ArchivedReApplication>> {
        sqlx::query_as(
            "SELECT id, source_id, account_id, previous_application_id, course, year_level,
                    grade_file, signature_file, status, office_id, interview_at, remarks,
                    semester_label, archived_at, delete_after, created_at, updated_at
             FROM archived_re_application ORDER BY archived_at DESC",
        )
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)
    }

    /// List archived leave requests
    pub async fn list_archived_leaves(
        &self,
    ) -> AppResult<Vec<crate::db::models::ArchivedLeaveRequest>> {
        sqlx::query_as(
            "SELECT id, source_id, application_id, date_from, date_to, reason, status,
                    decided_by, decided_at, semester_label, archived_at, delete_after,
                    created_at, updated_at
             FROM archived_leave_request ORDER BY archived_at DESC",
        )
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)
    }

    /// Delete archive rows past their scheduled deletion date
    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut purged = 0;

        for table in [
            "archived_application",
            "archived_re_application",
            "archived_leave_request",
        ] {
            let result = sqlx::query(&format!("DELETE FROM {} WHERE delete_after < ?1", table))
                .bind(now)
                .execute(&self.db)
                .await
                .map_err(AppError::Database)?;

            purged += result.rows_affected();
        }

        if purged > 0 {
            tracing::info!(purged, "Purged archive rows past retention");
        }

        Ok(purged)
    }
}

/// Semester / academic-year label for a timestamp.
///
/// The academic year starts in June: June-October is the 1st semester,
/// November-March the 2nd, April-May the summer term.
pub fn semester_label(at: DateTime<Utc>) -> String {
    let (year, month) = (at.year(), at.month());
    match month {
        6..=10 => format!("1st Semester AY {}-{}", year, year + 1),
        11..=12 => format!("2nd Semester AY {}-{}", year, year + 1),
        1..=3 => format!("2nd Semester AY {}-{}", year - 1, year),
        _ => format!("Summer AY {}-{}", year - 1, year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_account, test_pool};
    use chrono::{Duration, TimeZone};

    async fn insert_application(
        pool: &SqlitePool,
        id: &str,
        status: &str,
        updated_at: DateTime<Utc>,
    ) {
        seed_account(pool, "student-1").await;
        sqlx::query(
            "INSERT INTO application (id, account_id, course, year_level, status, created_at, updated_at)
             VALUES (?1, 'student-1', 'BS IT', 2, ?2, ?3, ?4)",
        )
        .bind(id)
        .bind(status)
        .bind(updated_at - Duration::days(30))
        .bind(updated_at)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn insert_leave(pool: &SqlitePool, id: &str, status: &str, updated_at: DateTime<Utc>) {
        sqlx::query(
            "INSERT INTO leave_request (id, application_id, date_from, date_to, reason, status, created_at, updated_at)
             VALUES (?1, 'app-1', '2024-01-01', '2024-01-02', 'reason', ?2, ?3, ?4)",
        )
        .bind(id)
        .bind(status)
        .bind(updated_at)
        .bind(updated_at)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_archives_old_rejected_application() {
        let pool = test_pool().await;
        let manager = ArchivalManager::new(pool.clone());

        let thirteen_months_ago = Utc::now() - Months::new(13);
        insert_application(&pool, "old-rejected", "rejected", thirteen_months_ago).await;

        let report = manager.run().await.unwrap();
        assert_eq!(report.applications_archived, 1);
        assert_eq!(report.failed, 0);

        // Original is gone, archive copy carries the metadata
        let live: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM application")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(live, 0);

        let row = sqlx::query(
            "SELECT source_id, status, semester_label, delete_after FROM archived_application",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(row.get::<String, _>("source_id"), "old-rejected");
        assert_eq!(row.get::<String, _>("status"), "rejected");
        assert!(!row.get::<String, _>("semester_label").is_empty());

        let delete_after: DateTime<Utc> = row.get("delete_after");
        assert!(delete_after > Utc::now() + Duration::days(700));
    }

    #[tokio::test]
    async fn test_skips_young_and_non_rejected() {
        let pool = test_pool().await;
        let manager = ArchivalManager::new(pool.clone());

        insert_application(&pool, "young-rejected", "rejected", Utc::now() - Months::new(6)).await;
        insert_application(&pool, "old-pending", "pending", Utc::now() - Months::new(18)).await;

        let report = manager.run().await.unwrap();
        assert_eq!(report.applications_archived, 0);

        let live: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM application")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(live, 2);
    }

    #[tokio::test]
    async fn test_never_double_archives() {
        let pool = test_pool().await;
        let manager = ArchivalManager::new(pool.clone());

        let old = Utc::now() - Months::new(14);
        insert_application(&pool, "app-1", "rejected", old).await;

        // Simulate an earlier run that archived but crashed before deleting
        sqlx::query(
            "INSERT INTO archived_application
                 (id, source_id, account_id, course, year_level, status, semester_label,
                  archived_at, delete_after, created_at, updated_at)
             VALUES ('arch-1', 'app-1', 'student-1', 'BS IT', 2, 'rejected', 'label', ?1, ?2, ?3, ?3)",
        )
        .bind(Utc::now())
        .bind(Utc::now() + Months::new(24))
        .bind(old)
        .execute(&pool)
        .await
        .unwrap();

        let report = manager.run().await.unwrap();
        assert_eq!(report.applications_archived, 0);

        let archived: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM archived_application")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(archived, 1);
    }

    #[tokio::test]
    async fn test_archives_disapproved_leave() {
        let pool = test_pool().await;
        let manager = ArchivalManager::new(pool.clone());

        insert_leave(&pool, "leave-1", "disapproved", Utc::now() - Months::new(15)).await;
        insert_leave(&pool, "leave-2", "approved", Utc::now() - Months::new(15)).await;

        let report = manager.run().await.unwrap();
        assert_eq!(report.leaves_archived, 1);

        let live: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leave_request")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(live, 1);
    }

    #[tokio::test]
    async fn test_purges_past_retention() {
        let pool = test_pool().await;
        let manager = ArchivalManager::new(pool.clone());

        sqlx::query(
            "INSERT INTO archived_application
                 (id, source_id, account_id, course, year_level, status, semester_label,
                  archived_at, delete_after, created_at, updated_at)
             VALUES ('arch-old', 'src-old', 's', 'c', 1, 'rejected', 'label', ?1, ?2, ?1, ?1)",
        )
        .bind(Utc::now() - Months::new(25))
        .bind(Utc::now() - Duration::days(1))
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO archived_application
                 (id, source_id, account_id, course, year_level, status, semester_label,
                  archived_at, delete_after, created_at, updated_at)
             VALUES ('arch-new', 'src-new', 's', 'c', 1, 'rejected', 'label', ?1, ?2, ?1, ?1)",
        )
        .bind(Utc::now())
        .bind(Utc::now() + Months::new(24))
        .execute(&pool)
        .await
        .unwrap();

        let report = manager.run().await.unwrap();
        assert_eq!(report.purged, 1);

        let remaining: String =
            sqlx::query_scalar("SELECT id FROM archived_application")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(remaining, "arch-new");
    }

    #[test]
    fn test_semester_label_boundaries() {
        let at = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();

        assert_eq!(semester_label(at(2025, 6, 1)), "1st Semester AY 2025-2026");
        assert_eq!(semester_label(at(2025, 10, 31)), "1st Semester AY 2025-2026");
        assert_eq!(semester_label(at(2025, 11, 1)), "2nd Semester AY 2025-2026");
        assert_eq!(semester_label(at(2026, 3, 31)), "2nd Semester AY 2025-2026");
        assert_eq!(semester_label(at(2026, 4, 15)), "Summer AY 2025-2026");
        assert_eq!(semester_label(at(2026, 5, 31)), "Summer AY 2025-2026");
    }
}
