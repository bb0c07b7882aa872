/// Application and re-application management
use crate::{
    db::models::{Application, ReApplication},
    error::{AppError, AppResult},
    scholarship::Status,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

const APPLICATION_COLUMNS: &str =
    "id, account_id, course, year_level, grade_file, signature_file, status, office_id,
     interview_at, remarks, created_at, updated_at";

const RE_APPLICATION_COLUMNS: &str =
    "id, account_id, previous_application_id, course, year_level, grade_file, signature_file,
     status, office_id, interview_at, remarks, created_at, updated_at";

/// Application manager service
#[derive(Clone)]
pub struct ApplicationManager {
    db: SqlitePool,
}

impl ApplicationManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Submit a new application. One non-terminal application per account.
    pub async fn submit(
        &self,
        account_id: &str,
        course: &str,
        year_level: i64,
        grade_file: Option<&str>,
        signature_file: Option<&str>,
    ) -> AppResult<Application> {
        if self.has_active_application(account_id).await? {
            return Err(AppError::Conflict(
                "Account already has an active application".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO application (id, account_id, course, year_level, grade_file, signature_file, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&id)
        .bind(account_id)
        .bind(course)
        .bind(year_level)
        .bind(grade_file)
        .bind(signature_file)
        .bind(Status::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(account_id, application_id = %id, "Application submitted");

        self.get(&id).await
    }

    /// True when the account holds a non-terminal application
    async fn has_active_application(&self, account_id: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM application
             WHERE account_id = ?1 AND status NOT IN ('completed', 'rejected', 'withdrawn')",
        )
        .bind(account_id)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(count > 0)
    }

    /// Get application by id
    pub async fn get(&self, id: &str) -> AppResult<Application> {
        sqlx::query_as::<_, Application>(&format!(
            "SELECT {} FROM application WHERE id = ?1",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))
    }

    /// List applications, optionally filtered by status and office
    pub async fn list(
        &self,
        status: Option<Status>,
        office_id: Option<&str>,
    ) -> AppResult<Vec<Application>> {
        let rows = match (status, office_id) {
            (Some(status), Some(office)) => {
                sqlx::query_as::<_, Application>(&format!(
                    "SELECT {} FROM application WHERE status = ?1 AND office_id = ?2 ORDER BY created_at DESC",
                    APPLICATION_COLUMNS
                ))
                .bind(status.as_str())
                .bind(office)
                .fetch_all(&self.db)
                .await
            }
            (Some(status), None) => {
                sqlx::query_as::<_, Application>(&format!(
                    "SELECT {} FROM application WHERE status = ?1 ORDER BY created_at DESC",
                    APPLICATION_COLUMNS
                ))
                .bind(status.as_str())
                .fetch_all(&self.db)
                .await
            }
            (None, Some(office)) => {
                sqlx::query_as::<_, Application>(&format!(
                    "SELECT {} FROM application WHERE office_id = ?1 ORDER BY created_at DESC",
                    APPLICATION_COLUMNS
                ))
                .bind(office)
                .fetch_all(&self.db)
                .await
            }
            (None, None) => {
                sqlx::query_as::<_, Application>(&format!(
                    "SELECT {} FROM application ORDER BY created_at DESC",
                    APPLICATION_COLUMNS
                ))
                .fetch_all(&self.db)
                .await
            }
        };

        rows.map_err(AppError::Database)
    }

    /// List applications belonging to one account (newest first)
    pub async fn list_for_account(&self, account_id: &str) -> AppResult<Vec<Application>> {
        sqlx::query_as::<_, Application>(&format!(
            "SELECT {} FROM application WHERE account_id = ?1 ORDER BY created_at DESC",
            APPLICATION_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)
    }

    /// Advance an application through the status machine
    pub async fn advance_status(
        &self,
        id: &str,
        next: Status,
        remarks: Option<&str>,
    ) -> AppResult<Application> {
        let application = self.get(id).await?;
        let current = Status::parse(&application.status)?;

        if !current.can_transition_to(next) {
            return Err(AppError::Validation(format!(
                "Cannot move application from {} to {}",
                current.as_str(),
                next.as_str()
            )));
        }

        sqlx::query(
            "UPDATE application SET status = ?1, remarks = COALESCE(?2, remarks), updated_at = ?3
             WHERE id = ?4",
        )
        .bind(next.as_str())
        .bind(remarks)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(application_id = id, from = current.as_str(), to = next.as_str(), "Application status changed");

        self.get(id).await
    }

    /// Schedule an interview, moving the application to for_interview
    pub async fn schedule_interview(
        &self,
        id: &str,
        interview_at: DateTime<Utc>,
    ) -> AppResult<Application> {
        let application = self.get(id).await?;
        let current = Status::parse(&application.status)?;

        if !current.can_transition_to(Status::ForInterview) {
            return Err(AppError::Validation(format!(
                "Cannot schedule interview from status {}",
                current.as_str()
            )));
        }

        sqlx::query(
            "UPDATE application SET status = ?1, interview_at = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(Status::ForInterview.as_str())
        .bind(interview_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        self.get(id).await
    }

    /// Deploy an approved applicant to an office
    pub async fn deploy(&self, id: &str, office_id: &str) -> AppResult<Application> {
        let application = self.get(id).await?;
        let current = Status::parse(&application.status)?;

        if current != Status::Approved {
            return Err(AppError::Validation(format!(
                "Only approved applications can be deployed (current: {})",
                current.as_str()
            )));
        }

        sqlx::query(
            "UPDATE application SET status = ?1, office_id = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(Status::Deployed.as_str())
        .bind(office_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(application_id = id, office_id, "Applicant deployed");

        self.get(id).await
    }

    /// Student-initiated withdrawal of a non-terminal application
    pub async fn withdraw(&self, id: &str, account_id: &str) -> AppResult<Application> {
        let application = self.get(id).await?;

        if application.account_id != account_id {
            return Err(AppError::Authorization(
                "Application belongs to another account".to_string(),
            ));
        }

        let current = Status::parse(&application.status)?;
        if current.is_terminal() {
            return Err(AppError::Validation(
                "Application is already in a terminal status".to_string(),
            ));
        }

        sqlx::query("UPDATE application SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(Status::Withdrawn.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        self.get(id).await
    }

    // ==================== Re-applications ====================

    /// Submit a re-application; the prior application must be terminal
    pub async fn submit_reapplication(
        &self,
        account_id: &str,
        previous_application_id: &str,
        course: &str,
        year_level: i64,
        grade_file: Option<&str>,
        signature_file: Option<&str>,
    ) -> AppResult<ReApplication> {
        let previous = self.get(previous_application_id).await?;

        if previous.account_id != account_id {
            return Err(AppError::Authorization(
                "Previous application belongs to another account".to_string(),
            ));
        }

        if !Status::parse(&previous.status)?.is_terminal() {
            return Err(AppError::Conflict(
                "Previous application is still active".to_string(),
            ));
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM re_application
             WHERE account_id = ?1 AND status NOT IN ('completed', 'rejected', 'withdrawn')",
        )
        .bind(account_id)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        if active > 0 {
            return Err(AppError::Conflict(
                "Account already has an active re-application".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO re_application (id, account_id, previous_application_id, course, year_level, grade_file, signature_file, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&id)
        .bind(account_id)
        .bind(previous_application_id)
        .bind(course)
        .bind(year_level)
        .bind(grade_file)
        .bind(signature_file)
        .bind(Status::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(account_id, re_application_id = %id, "Re-application submitted");

        self.get_reapplication(&id).await
    }

    /// Get re-application by id
    pub async fn get_reapplication(&self, id: &str) -> AppResult<ReApplication> {
        sqlx::query_as::<_, ReApplication>(&format!(
            "SELECT {} FROM re_application WHERE id = ?1",
            RE_APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Re-application not found".to_string()))
    }

    /// List re-applications, optionally filtered by status
    pub async fn list_reapplications(&self, status: Option<Status>) -> AppResult<Vec<ReApplication>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, ReApplication>(&format!(
                    "SELECT {} FROM re_application WHERE status = ?1 ORDER BY created_at DESC",
                    RE_APPLICATION_COLUMNS
                ))
                .bind(status.as_str())
                .fetch_all(&self.db)
                .await
            }
            None => {
                sqlx::query_as::<_, ReApplication>(&format!(
                    "SELECT {} FROM re_application ORDER BY created_at DESC",
                    RE_APPLICATION_COLUMNS
                ))
                .fetch_all(&self.db)
                .await
            }
        };

        rows.map_err(AppError::Database)
    }

    /// Advance a re-application through the same status machine
    pub async fn advance_reapplication_status(
        &self,
        id: &str,
        next: Status,
        remarks: Option<&str>,
    ) -> AppResult<ReApplication> {
        let re_application = self.get_reapplication(id).await?;
        let current = Status::parse(&re_application.status)?;

        if !current.can_transition_to(next) {
            return Err(AppError::Validation(format!(
                "Cannot move re-application from {} to {}",
                current.as_str(),
                next.as_str()
            )));
        }

        sqlx::query(
            "UPDATE re_application SET status = ?1, remarks = COALESCE(?2, remarks), updated_at = ?3
             WHERE id = ?4",
        )
        .bind(next.as_str())
        .bind(remarks)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        self.get_reapplication(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_account, test_pool};

    async fn create_test_manager() -> ApplicationManager {
        let pool = test_pool().await;
        seed_account(&pool, "student-1").await;
        seed_account(&pool, "s1").await;
        seed_account(&pool, "s2").await;
        ApplicationManager::new(pool)
    }

    #[tokio::test]
    async fn test_submit_and_single_active() {
        let manager = create_test_manager().await;

        let app = manager
            .submit("student-1", "BS Computer Science", 2, None, None)
            .await
            .unwrap();
        assert_eq!(app.status, "pending");

        let result = manager.submit("student-1", "BS Biology", 2, None, None).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // A rejected application frees the slot
        manager
            .advance_status(&app.id, Status::Rejected, Some("incomplete requirements"))
            .await
            .unwrap();
        assert!(manager.submit("student-1", "BS Biology", 2, None, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_status_machine_rejects_illegal_jump() {
        let manager = create_test_manager().await;

        let app = manager
            .submit("student-1", "BS Math", 3, None, None)
            .await
            .unwrap();

        // pending -> deployed is not a legal transition
        let result = manager.advance_status(&app.id, Status::Deployed, None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        // The full happy path
        for next in [
            Status::Shortlisted,
            Status::ForInterview,
            Status::Interviewed,
            Status::Approved,
        ] {
            manager.advance_status(&app.id, next, None).await.unwrap();
        }

        let deployed = manager.deploy(&app.id, "office-1").await.unwrap();
        assert_eq!(deployed.status, "deployed");
        assert_eq!(deployed.office_id.as_deref(), Some("office-1"));

        manager.advance_status(&app.id, Status::Completed, None).await.unwrap();

        // Terminal status is final
        let result = manager.advance_status(&app.id, Status::Pending, None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_schedule_interview() {
        let manager = create_test_manager().await;

        let app = manager
            .submit("student-1", "BS Nursing", 1, None, None)
            .await
            .unwrap();

        let when = Utc::now() + chrono::Duration::days(7);
        let scheduled = manager.schedule_interview(&app.id, when).await.unwrap();
        assert_eq!(scheduled.status, "for_interview");
        assert!(scheduled.interview_at.is_some());

        // Cannot schedule again once already for_interview
        let result = manager.schedule_interview(&app.id, when).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_deploy_requires_approved() {
        let manager = create_test_manager().await;

        let app = manager
            .submit("student-1", "BS Education", 4, None, None)
            .await
            .unwrap();

        let result = manager.deploy(&app.id, "office-1").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_withdraw_owner_only() {
        let manager = create_test_manager().await;

        let app = manager
            .submit("student-1", "BS Psychology", 2, None, None)
            .await
            .unwrap();

        let result = manager.withdraw(&app.id, "someone-else").await;
        assert!(matches!(result, Err(AppError::Authorization(_))));

        let withdrawn = manager.withdraw(&app.id, "student-1").await.unwrap();
        assert_eq!(withdrawn.status, "withdrawn");

        let result = manager.withdraw(&app.id, "student-1").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reapplication_requires_terminal_prior() {
        let manager = create_test_manager().await;

        let app = manager
            .submit("student-1", "BS Chemistry", 2, None, None)
            .await
            .unwrap();

        let result = manager
            .submit_reapplication("student-1", &app.id, "BS Chemistry", 3, None, None)
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        manager
            .advance_status(&app.id, Status::Rejected, None)
            .await
            .unwrap();

        let re_app = manager
            .submit_reapplication("student-1", &app.id, "BS Chemistry", 3, None, None)
            .await
            .unwrap();
        assert_eq!(re_app.status, "pending");
        assert_eq!(re_app.previous_application_id, app.id);

        // Re-applications follow the same machine
        let result = manager
            .advance_reapplication_status(&re_app.id, Status::Deployed, None)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let manager = create_test_manager().await;

        let a = manager.submit("s1", "Course A", 1, None, None).await.unwrap();
        let b = manager.submit("s2", "Course B", 2, None, None).await.unwrap();
        manager.advance_status(&b.id, Status::Rejected, None).await.unwrap();

        let pending = manager.list(Some(Status::Pending), None).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a.id);

        let all = manager.list(None, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let own = manager.list_for_account("s2").await.unwrap();
        assert_eq!(own.len(), 1);
    }
}
