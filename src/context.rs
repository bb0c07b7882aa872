/// Application context and dependency injection
use crate::{
    account::AccountManager,
    archival::ArchivalManager,
    audit::AuditLogManager,
    config::ServerConfig,
    db,
    error::{AppError, AppResult},
    mailer::Mailer,
    office::ProfileManager,
    scholarship::{ApplicationManager, DtrManager, LeaveManager},
    uploads::UploadStore,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub profile_manager: Arc<ProfileManager>,
    pub application_manager: Arc<ApplicationManager>,
    pub dtr_manager: Arc<DtrManager>,
    pub leave_manager: Arc<LeaveManager>,
    pub archival_manager: Arc<ArchivalManager>,
    pub audit_log: Arc<AuditLogManager>,
    pub upload_store: Arc<UploadStore>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;

        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(pool.clone(), config.clone()));
        let profile_manager = Arc::new(ProfileManager::new(pool.clone()));
        let application_manager = Arc::new(ApplicationManager::new(pool.clone()));
        let dtr_manager = Arc::new(DtrManager::new(pool.clone()));
        let leave_manager = Arc::new(LeaveManager::new(pool.clone()));
        let archival_manager = Arc::new(ArchivalManager::new(pool.clone()));
        let audit_log = Arc::new(AuditLogManager::new(pool.clone()));

        let upload_store = Arc::new(UploadStore::new(
            config.storage.upload_directory.clone(),
            config.service.upload_limit,
        ));

        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        Ok(Self {
            config,
            db: pool,
            account_manager,
            profile_manager,
            application_manager,
            dtr_manager,
            leave_manager,
            archival_manager,
            audit_log,
            upload_store,
            mailer,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AppResult<()> {
        let dirs = vec![&config.storage.data_directory, &config.storage.upload_directory];

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    AppError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
