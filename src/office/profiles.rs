/// Office profile manager
use crate::{
    db::models::OfficeProfile,
    error::{AppError, AppResult},
    office::permissions,
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Hard cap on sub-profiles per office account
pub const MAX_PROFILES_PER_ACCOUNT: i64 = 5;

/// Office profile manager
#[derive(Clone)]
pub struct ProfileManager {
    db: SqlitePool,
}

impl ProfileManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a profile under an office account
    pub async fn create_profile(
        &self,
        account_id: &str,
        name: &str,
        pin: &str,
        perms: i64,
    ) -> AppResult<OfficeProfile> {
        validate_pin(pin)?;

        if name.trim().is_empty() {
            return Err(AppError::Validation("Profile name cannot be empty".to_string()));
        }

        if perms & !permissions::ALL != 0 {
            return Err(AppError::Validation("Unknown permission bits".to_string()));
        }

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM office_profile WHERE account_id = ?1")
                .bind(account_id)
                .fetch_one(&self.db)
                .await
                .map_err(AppError::Database)?;

        if count >= MAX_PROFILES_PER_ACCOUNT {
            return Err(AppError::Conflict(format!(
                "Account already has {} profiles",
                MAX_PROFILES_PER_ACCOUNT
            )));
        }

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM office_profile WHERE account_id = ?1 AND name = ?2",
        )
        .bind(account_id)
        .bind(name)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        if existing > 0 {
            return Err(AppError::Conflict(format!("Profile '{}' already exists", name)));
        }

        let pin_hash = bcrypt::hash(pin, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("PIN hashing failed: {}", e)))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO office_profile (id, account_id, name, pin_hash, permissions, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&id)
        .bind(account_id)
        .bind(name)
        .bind(&pin_hash)
        .bind(perms)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(account_id, profile_id = %id, "Created office profile");

        Ok(OfficeProfile {
            id,
            account_id: account_id.to_string(),
            name: name.to_string(),
            pin_hash,
            permissions: perms,
            created_at: now,
            updated_at: now,
        })
    }

    /// List profiles for an account
    pub async fn list_profiles(&self, account_id: &str) -> AppResult<Vec<OfficeProfile>> {
        sqlx::query_as::<_, OfficeProfile>(
            "SELECT id, account_id, name, pin_hash, permissions, created_at, updated_at
             FROM office_profile WHERE account_id = ?1 ORDER BY created_at",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)
    }

    /// Get one profile, scoped to its owning account
    pub async fn get_profile(&self, account_id: &str, profile_id: &str) -> AppResult<OfficeProfile> {
        sqlx::query_as::<_, OfficeProfile>(
            "SELECT id, account_id, name, pin_hash, permissions, created_at, updated_at
             FROM office_profile WHERE id = ?1 AND account_id = ?2",
        )
        .bind(profile_id)
        .bind(account_id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    /// Update name, PIN, or permissions of a profile
    pub async fn update_profile(
        &self,
        account_id: &str,
        profile_id: &str,
        name: Option<&str>,
        pin: Option<&str>,
        perms: Option<i64>,
    ) -> AppResult<OfficeProfile> {
        let mut profile = self.get_profile(account_id, profile_id).await?;

        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Profile name cannot be empty".to_string()));
            }
            profile.name = name.to_string();
        }

        if let Some(pin) = pin {
            validate_pin(pin)?;
            profile.pin_hash = bcrypt::hash(pin, bcrypt::DEFAULT_COST)
                .map_err(|e| AppError::Internal(format!("PIN hashing failed: {}", e)))?;
        }

        if let Some(perms) = perms {
            if perms & !permissions::ALL != 0 {
                return Err(AppError::Validation("Unknown permission bits".to_string()));
            }
            profile.permissions = perms;
        }

        profile.updated_at = Utc::now();

        sqlx::query(
            "UPDATE office_profile SET name = ?1, pin_hash = ?2, permissions = ?3, updated_at = ?4
             WHERE id = ?5 AND account_id = ?6",
        )
        .bind(&profile.name)
        .bind(&profile.pin_hash)
        .bind(profile.permissions)
        .bind(profile.updated_at)
        .bind(profile_id)
        .bind(account_id)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(profile)
    }

    /// Delete a profile and every session scoped to it
    pub async fn delete_profile(&self, account_id: &str, profile_id: &str) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM office_profile WHERE id = ?1 AND account_id = ?2",
        )
        .bind(profile_id)
        .bind(account_id)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Profile not found".to_string()));
        }

        sqlx::query("DELETE FROM session WHERE profile_id = ?1")
            .bind(profile_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        tracing::info!(account_id, profile_id, "Deleted office profile");

        Ok(())
    }

    /// Verify a profile PIN; wrong PIN is an authentication failure
    pub async fn verify_pin(
        &self,
        account_id: &str,
        profile_id: &str,
        pin: &str,
    ) -> AppResult<OfficeProfile> {
        let profile = self.get_profile(account_id, profile_id).await?;

        let valid = bcrypt::verify(pin, &profile.pin_hash)
            .map_err(|e| AppError::Internal(format!("PIN verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::Authentication("Incorrect PIN".to_string()));
        }

        Ok(profile)
    }

    /// Fetch the permission bitset of a profile without the account scope
    /// (used by authorization checks on profile-scoped sessions)
    pub async fn get_permissions(&self, profile_id: &str) -> AppResult<i64> {
        sqlx::query_scalar("SELECT permissions FROM office_profile WHERE id = ?1")
            .bind(profile_id)
            .fetch_optional(&self.db)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }
}

/// PIN must be exactly 4 digits
fn validate_pin(pin: &str) -> AppResult<()> {
    if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("PIN must be exactly 4 digits".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_account, test_pool};
    use crate::office::permissions;

    async fn create_test_manager() -> ProfileManager {
        let pool = test_pool().await;
        seed_account(&pool, "office-1").await;
        seed_account(&pool, "office-2").await;
        ProfileManager::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_list_profiles() {
        let manager = create_test_manager().await;

        let profile = manager
            .create_profile("office-1", "Registrar Desk", "1234", permissions::REVIEW_DTR)
            .await
            .unwrap();

        assert_eq!(profile.name, "Registrar Desk");
        assert_eq!(profile.permissions, permissions::REVIEW_DTR);

        let profiles = manager.list_profiles("office-1").await.unwrap();
        assert_eq!(profiles.len(), 1);
    }

    #[tokio::test]
    async fn test_profile_limit() {
        let manager = create_test_manager().await;

        for i in 0..MAX_PROFILES_PER_ACCOUNT {
            manager
                .create_profile("office-1", &format!("Desk {}", i), "1234", 0)
                .await
                .unwrap();
        }

        let result = manager.create_profile("office-1", "One Too Many", "1234", 0).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // The cap is per account
        assert!(manager.create_profile("office-2", "Desk", "1234", 0).await.is_ok());
    }

    #[tokio::test]
    async fn test_pin_validation() {
        let manager = create_test_manager().await;

        for bad in ["123", "12345", "12a4", ""] {
            let result = manager.create_profile("office-1", "Desk", bad, 0).await;
            assert!(matches!(result, Err(AppError::Validation(_))), "PIN {:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_verify_pin() {
        let manager = create_test_manager().await;

        let profile = manager
            .create_profile("office-1", "Desk", "4321", permissions::ALL)
            .await
            .unwrap();

        assert!(manager.verify_pin("office-1", &profile.id, "4321").await.is_ok());

        let result = manager.verify_pin("office-1", &profile.id, "0000").await;
        assert!(matches!(result, Err(AppError::Authentication(_))));

        // Another account cannot reach the profile at all
        let result = manager.verify_pin("office-2", &profile.id, "4321").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let manager = create_test_manager().await;

        let profile = manager
            .create_profile("office-1", "Desk", "1111", 0)
            .await
            .unwrap();

        let updated = manager
            .update_profile(
                "office-1",
                &profile.id,
                Some("Front Desk"),
                Some("2222"),
                Some(permissions::APPROVE_LEAVE),
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Front Desk");
        assert_eq!(updated.permissions, permissions::APPROVE_LEAVE);

        assert!(manager.verify_pin("office-1", &profile.id, "2222").await.is_ok());
        assert!(manager.verify_pin("office-1", &profile.id, "1111").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_permission_bits_rejected() {
        let manager = create_test_manager().await;

        let result = manager
            .create_profile("office-1", "Desk", "1234", 1 << 40)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_profile_drops_scoped_sessions() {
        let manager = create_test_manager().await;

        let profile = manager
            .create_profile("office-1", "Desk", "1234", 0)
            .await
            .unwrap();

        // Seed a session scoped to the profile
        sqlx::query(
            "INSERT INTO session (id, account_id, profile_id, refresh_token, created_at, expires_at)
             VALUES ('s1', 'office-1', ?1, 'rt1', ?2, ?3)",
        )
        .bind(&profile.id)
        .bind(chrono::Utc::now())
        .bind(chrono::Utc::now() + chrono::Duration::days(30))
        .execute(&manager.db)
        .await
        .unwrap();

        manager.delete_profile("office-1", &profile.id).await.unwrap();

        let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session")
            .fetch_one(&manager.db)
            .await
            .unwrap();
        assert_eq!(sessions, 0);
    }

    #[test]
    fn test_permission_bitset() {
        let granted = permissions::REVIEW_DTR | permissions::APPROVE_LEAVE;
        assert!(permissions::has(granted, permissions::REVIEW_DTR));
        assert!(!permissions::has(granted, permissions::MANAGE_TRAINEES));
        assert!(permissions::has(permissions::ALL, granted));
    }
}
