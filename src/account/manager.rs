/// Account manager implementation using runtime queries
///
/// Uses sqlx runtime query building instead of compile-time macros to
/// avoid needing DATABASE_URL during compilation.

use crate::{
    account::ValidatedSession,
    config::ServerConfig,
    db::models::{Account, Role, Session},
    error::{AppError, AppResult},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Access token claims. `pid` is set only for profile-scoped sessions.
#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    sid: String,
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<String>,
    iat: i64,
    exp: i64,
}

/// Token pair issued for a session
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub session_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Create a new account
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> AppResult<Account> {
        let email = email.trim().to_lowercase();
        self.validate_email(&email)?;
        self.validate_password(password)?;

        if self.email_exists(&email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO account (id, email, password_hash, role, full_name, email_verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(full_name)
        .bind(false)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(Account {
            id,
            email,
            password_hash,
            role: role.as_str().to_string(),
            full_name: full_name.to_string(),
            email_verified: false,
            pending_email: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Authenticate credentials and create a session
    pub async fn signin(
        &self,
        email: &str,
        password: &str,
        user_agent: Option<&str>,
    ) -> AppResult<(Account, SessionTokens)> {
        let account = self
            .get_account_by_email(&email.trim().to_lowercase())
            .await
            .map_err(|e| match e {
                // Unknown email looks the same as a bad password
                AppError::NotFound(_) => {
                    AppError::Authentication("Invalid credentials".to_string())
                }
                other => other,
            })?;

        let valid = bcrypt::verify(password, &account.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let tokens = self.create_session(&account, None, user_agent).await?;

        Ok((account, tokens))
    }

    /// Create a session for an account, optionally scoped to an office profile
    pub async fn create_session(
        &self,
        account: &Account,
        profile_id: Option<&str>,
        user_agent: Option<&str>,
    ) -> AppResult<SessionTokens> {
        let session_id = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();

        let now = Utc::now();
        let expires_at = now + Duration::days(self.config.authentication.session_ttl_days);

        sqlx::query(
            "INSERT INTO session (id, account_id, profile_id, user_agent, refresh_token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&session_id)
        .bind(&account.id)
        .bind(profile_id)
        .bind(user_agent)
        .bind(&refresh_token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        let access_token =
            self.generate_access_token(&account.id, &session_id, &account.role, profile_id)?;

        crate::metrics::record_session_opened();

        Ok(SessionTokens {
            session_id,
            access_token,
            refresh_token,
            expires_at,
        })
    }

    /// Validate an access token and return session info
    ///
    /// Verifies the JWT signature and expiry, then checks the backing
    /// session row still exists and has not expired.
    pub async fn validate_access_token(&self, token: &str) -> AppResult<ValidatedSession> {
        let decoding_key =
            DecodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        // Allow some clock skew (5 minutes)
        validation.leeway = 300;

        let data = decode::<AccessClaims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::Authentication("Invalid token signature".to_string())
                }
                _ => AppError::Authentication(format!("Invalid token: {}", e)),
            }
        })?;

        let claims = data.claims;

        let row = sqlx::query("SELECT account_id, profile_id, expires_at FROM session WHERE id = ?1")
            .bind(&claims.sid)
            .fetch_optional(&self.db)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::Authentication("Session no longer exists".to_string()))?;

        let expires_at: DateTime<Utc> = row.get("expires_at");
        if Utc::now() > expires_at {
            return Err(AppError::Authentication("Session expired".to_string()));
        }

        Ok(ValidatedSession {
            account_id: claims.sub,
            session_id: claims.sid,
            role: Role::parse(&claims.role)?,
            profile_id: row.get("profile_id"),
        })
    }

    /// Refresh a session by its refresh token
    ///
    /// Extends the session expiry only when it is within 24 hours of
    /// expiring; otherwise just reissues an access token. Concurrent
    /// refreshes are not coordinated.
    pub async fn refresh_session(&self, refresh_token: &str) -> AppResult<SessionTokens> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, account_id, profile_id, user_agent, refresh_token, created_at, expires_at
             FROM session WHERE refresh_token = ?1",
        )
        .bind(refresh_token)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::Authentication("Invalid refresh token".to_string()))?;

        let now = Utc::now();
        if now > session.expires_at {
            // Expired session is useless; drop the row
            self.delete_session(&session.id).await?;
            return Err(AppError::Authentication("Session expired".to_string()));
        }

        let mut expires_at = session.expires_at;
        if session.expires_at - now < Duration::hours(24) {
            expires_at = now + Duration::days(self.config.authentication.session_ttl_days);
            sqlx::query("UPDATE session SET expires_at = ?1 WHERE id = ?2")
                .bind(expires_at)
                .bind(&session.id)
                .execute(&self.db)
                .await
                .map_err(AppError::Database)?;

            tracing::debug!(session_id = %session.id, "Extended session expiry on refresh");
        }

        let account = self.get_account(&session.account_id).await?;
        let access_token = self.generate_access_token(
            &account.id,
            &session.id,
            &account.role,
            session.profile_id.as_deref(),
        )?;

        Ok(SessionTokens {
            session_id: session.id,
            access_token,
            refresh_token: session.refresh_token,
            expires_at,
        })
    }

    /// Delete a session (signout)
    pub async fn delete_session(&self, session_id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM session WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        crate::metrics::record_sessions_closed(result.rows_affected());

        Ok(())
    }

    /// Delete every session belonging to an account
    pub async fn delete_sessions_for_account(&self, account_id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE account_id = ?1")
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        crate::metrics::record_sessions_closed(result.rows_affected());

        Ok(result.rows_affected())
    }

    /// Get account by id
    pub async fn get_account(&self, account_id: &str) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, role, full_name, email_verified, pending_email,
                    created_at, updated_at
             FROM account WHERE id = ?1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Get account by email
    pub async fn get_account_by_email(&self, email: &str) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, role, full_name, email_verified, pending_email,
                    created_at, updated_at
             FROM account WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Check if email exists
    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(AppError::Database)?;

        Ok(count > 0)
    }

    /// Change password after verifying the current one
    ///
    /// Every session for the account is invalidated afterwards.
    pub async fn change_password(
        &self,
        account_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let account = self.get_account(account_id).await?;

        let valid = bcrypt::verify(current_password, &account.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::Authentication("Current password is incorrect".to_string()));
        }

        self.validate_password(new_password)?;

        let password_hash = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        sqlx::query("UPDATE account SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&password_hash)
            .bind(Utc::now())
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        let dropped = self.delete_sessions_for_account(account_id).await?;
        tracing::info!(account_id, dropped, "Password changed, sessions invalidated");

        Ok(())
    }

    /// Generate and store an email verification token (24 hour expiry)
    pub async fn generate_email_verification_token(&self, account_id: &str) -> AppResult<String> {
        self.insert_email_token(account_id, "verify_email", None, Duration::hours(24))
            .await
    }

    /// Consume a verification token and mark the account email verified
    pub async fn verify_email(&self, token: &str) -> AppResult<String> {
        let account_id = self.consume_email_token(token, "verify_email").await?.0;

        sqlx::query("UPDATE account SET email_verified = true, updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(&account_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        tracing::info!(account_id, "Email verified");

        Ok(account_id)
    }

    /// Stage an email change: records the pending address and issues a
    /// confirmation token for it
    pub async fn request_email_change(
        &self,
        account_id: &str,
        new_email: &str,
    ) -> AppResult<String> {
        let new_email = new_email.trim().to_lowercase();
        self.validate_email(&new_email)?;

        if self.email_exists(&new_email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        sqlx::query("UPDATE account SET pending_email = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&new_email)
            .bind(Utc::now())
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        self.insert_email_token(account_id, "change_email", Some(&new_email), Duration::hours(24))
            .await
    }

    /// Apply a staged email change
    pub async fn confirm_email_change(&self, token: &str) -> AppResult<String> {
        let (account_id, new_email) = self.consume_email_token(token, "change_email").await?;

        let new_email = new_email.ok_or_else(|| {
            AppError::Internal("Email change token missing target address".to_string())
        })?;

        // The address may have been registered since the token was issued
        if self.email_exists(&new_email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        sqlx::query(
            "UPDATE account SET email = ?1, pending_email = NULL, email_verified = true, updated_at = ?2
             WHERE id = ?3",
        )
        .bind(&new_email)
        .bind(Utc::now())
        .bind(&account_id)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(account_id, "Email change applied");

        Ok(account_id)
    }

    /// Insert an email token row and return the token
    async fn insert_email_token(
        &self,
        account_id: &str,
        purpose: &str,
        new_email: Option<&str>,
        ttl: Duration,
    ) -> AppResult<String> {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO email_token (token, account_id, purpose, new_email, created_at, expires_at, used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&token)
        .bind(account_id)
        .bind(purpose)
        .bind(new_email)
        .bind(now)
        .bind(now + ttl)
        .bind(false)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(token)
    }

    /// Validate and mark an email token used; returns (account_id, new_email)
    async fn consume_email_token(
        &self,
        token: &str,
        purpose: &str,
    ) -> AppResult<(String, Option<String>)> {
        let row = sqlx::query(
            "SELECT account_id, new_email, expires_at, used FROM email_token
             WHERE token = ?1 AND purpose = ?2",
        )
        .bind(token)
        .bind(purpose)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Invalid token".to_string()))?;

        let used: bool = row.try_get("used")?;
        if used {
            return Err(AppError::Validation("Token has already been used".to_string()));
        }

        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        if Utc::now() > expires_at {
            return Err(AppError::Validation("Token has expired".to_string()));
        }

        sqlx::query("UPDATE email_token SET used = true WHERE token = ?1")
            .bind(token)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        Ok((row.try_get("account_id")?, row.try_get("new_email")?))
    }

    /// Cleanup expired sessions and email tokens
    ///
    /// Called periodically by the background scheduler. Returns
    /// (sessions_deleted, tokens_deleted).
    pub async fn cleanup_expired_sessions(&self) -> AppResult<(u64, u64)> {
        let now = Utc::now();

        let sessions = sqlx::query("DELETE FROM session WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        let tokens = sqlx::query("DELETE FROM email_token WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        crate::metrics::record_sessions_closed(sessions);

        if sessions > 0 || tokens > 0 {
            tracing::info!(sessions, tokens, "Cleaned up expired sessions and tokens");
        } else {
            tracing::debug!("Session cleanup: nothing expired");
        }

        Ok((sessions, tokens))
    }

    /// Generate access JWT
    fn generate_access_token(
        &self,
        account_id: &str,
        session_id: &str,
        role: &str,
        profile_id: Option<&str>,
    ) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: account_id.to_string(),
            sid: session_id.to_string(),
            role: role.to_string(),
            pid: profile_id.map(|s| s.to_string()),
            iat: now,
            exp: now + self.config.authentication.access_ttl_minutes * 60,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(format!("Failed to generate token: {}", e)))
    }

    fn validate_email(&self, email: &str) -> AppResult<()> {
        if !email.contains('@') || email.len() > 254 {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }

        Ok(())
    }

    fn validate_password(&self, password: &str) -> AppResult<()> {
        if password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        if password.len() > 128 {
            return Err(AppError::Validation("Password too long".to_string()));
        }

        Ok(())
    }
}
